//! Detached notification delivery.
//!
//! Business operations enqueue a [`Notification`] and return immediately. A
//! dispatch task drains the queue and delivers each notification on its own
//! task, at most [`MAX_CONCURRENT_DELIVERIES`] at a time, so a slow gift card
//! order never holds up other mail. Failures are logged with the notification
//! kind and recipient and go no further.

use std::sync::Arc;

use askama::Template;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::Instrument;
use url::Url;

use dmarketplace_core::{Email, OrderItemId, SellerId};

use crate::gifq::{GiftCard, GiftCardIssuer};
use crate::models::OrderItem;
use crate::services::email::{EmailError, Mailer, OutgoingEmail};

/// Deliveries allowed in flight at once.
pub const MAX_CONCURRENT_DELIVERIES: usize = 32;

#[derive(Template)]
#[template(path = "email/store_approval.html")]
struct StoreApprovalHtml<'a> {
    heading: &'a str,
    shop_name: &'a str,
    phase: &'a str,
    reason: Option<&'a str>,
    dashboard_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/store_approval.txt")]
struct StoreApprovalText<'a> {
    heading: &'a str,
    shop_name: &'a str,
    phase: &'a str,
    reason: Option<&'a str>,
    dashboard_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order_item_id: OrderItemId,
    product_name: &'a str,
    quantity: i32,
    product_price: String,
    total_amount: String,
    status: &'a str,
    delivery_address: &'a str,
    city: &'a str,
    zip_code: &'a str,
    state: &'a str,
    country: &'a str,
    gift_card_sent: bool,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order_item_id: OrderItemId,
    product_name: &'a str,
    quantity: i32,
    product_price: String,
    total_amount: String,
    status: &'a str,
    delivery_address: &'a str,
    city: &'a str,
    zip_code: &'a str,
    state: &'a str,
    country: &'a str,
    gift_card_sent: bool,
}

#[derive(Template)]
#[template(path = "email/gift_card.html")]
struct GiftCardHtml<'a> {
    order_item_id: OrderItemId,
    card: &'a GiftCard,
}

#[derive(Template)]
#[template(path = "email/gift_card.txt")]
struct GiftCardText<'a> {
    order_item_id: OrderItemId,
    card: &'a GiftCard,
}

/// Where a store application stands, as told to the merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalPhase {
    Submitted,
    Approved,
    Rejected { reason: String },
}

impl ApprovalPhase {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// A message to deliver outside the request path.
#[derive(Debug, Clone)]
pub enum Notification {
    StoreApproval {
        seller_id: SellerId,
        shop_name: String,
        recipient: Email,
        phase: ApprovalPhase,
    },
    /// Runs the gift card flow first, then confirms the order.
    OrderConfirmation { item: Box<OrderItem> },
    GiftCard {
        order_item_id: OrderItemId,
        recipient: Email,
        card: Box<GiftCard>,
    },
}

impl Notification {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StoreApproval { .. } => "store-approval",
            Self::OrderConfirmation { .. } => "order-confirmation",
            Self::GiftCard { .. } => "gift-card",
        }
    }

    #[must_use]
    pub const fn recipient(&self) -> &Email {
        match self {
            Self::StoreApproval { recipient, .. } | Self::GiftCard { recipient, .. } => recipient,
            Self::OrderConfirmation { item } => &item.user_email,
        }
    }
}

/// Handle for enqueueing notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationDispatcher {
    /// Start dispatching to `worker`.
    ///
    /// The task ends once every dispatcher clone is dropped, the queue is
    /// empty and in-flight deliveries have finished; await the returned
    /// handle to drain it on shutdown.
    #[must_use]
    pub fn spawn(worker: NotificationWorker) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
        let worker = Arc::new(worker);
        let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_DELIVERIES));

        let handle = tokio::spawn(async move {
            let mut deliveries = JoinSet::new();
            while let Some(notification) = rx.recv().await {
                while let Some(finished) = deliveries.try_join_next() {
                    log_join_error(finished);
                }

                let span = tracing::info_span!(
                    "notification",
                    kind = notification.kind(),
                    recipient = %notification.recipient(),
                );
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    tracing::error!(
                        kind = notification.kind(),
                        "Delivery permits closed, dropping notification"
                    );
                    break;
                };
                let worker = worker.clone();
                deliveries.spawn(
                    async move {
                        worker.deliver(notification).await;
                        drop(permit);
                    }
                    .instrument(span),
                );
            }

            while let Some(finished) = deliveries.join_next().await {
                log_join_error(finished);
            }
            tracing::debug!("Notification queue drained");
        });
        (Self { tx }, handle)
    }

    /// Enqueue a notification. Never blocks.
    pub fn notify(&self, notification: Notification) {
        let kind = notification.kind();
        if self.tx.send(notification).is_err() {
            tracing::error!(kind, "Notification worker is gone, dropping notification");
        }
    }
}

fn log_join_error(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        tracing::error!(error = %e, "Notification delivery task failed");
    }
}

/// Renders and sends notifications.
pub struct NotificationWorker {
    mailer: Arc<dyn Mailer>,
    gift_cards: Option<GiftCardIssuer>,
    dashboard_url: Url,
}

impl NotificationWorker {
    #[must_use]
    pub fn new(
        mailer: Arc<dyn Mailer>,
        gift_cards: Option<GiftCardIssuer>,
        dashboard_url: Url,
    ) -> Self {
        Self {
            mailer,
            gift_cards,
            dashboard_url,
        }
    }

    async fn deliver(&self, notification: Notification) {
        let kind = notification.kind();
        let recipient = notification.recipient().to_string();

        let result = match notification {
            Notification::StoreApproval {
                seller_id,
                shop_name,
                recipient,
                phase,
            } => {
                self.send_store_approval(seller_id, &shop_name, &recipient, &phase)
                    .await
            }
            Notification::OrderConfirmation { item } => self.send_order_confirmation(&item).await,
            Notification::GiftCard {
                order_item_id,
                recipient,
                card,
            } => self.send_gift_card(order_item_id, &recipient, &card).await,
        };

        if let Err(e) = result {
            tracing::error!(kind, recipient = %recipient, error = %e, "Failed to send notification");
        }
    }

    fn dashboard_link(&self, seller_id: SellerId) -> String {
        format!(
            "{}/{seller_id}",
            self.dashboard_url.as_str().trim_end_matches('/')
        )
    }

    async fn send_store_approval(
        &self,
        seller_id: SellerId,
        shop_name: &str,
        recipient: &Email,
        phase: &ApprovalPhase,
    ) -> Result<(), EmailError> {
        let (subject, heading) = match phase {
            ApprovalPhase::Submitted => (
                "We received your store application",
                "Application received",
            ),
            ApprovalPhase::Approved => ("Your store has been approved", "Welcome aboard"),
            ApprovalPhase::Rejected { .. } => (
                "Update on your store application",
                "Application not approved",
            ),
        };
        let reason = match phase {
            ApprovalPhase::Rejected { reason } => Some(reason.as_str()),
            _ => None,
        };
        let dashboard_url = self.dashboard_link(seller_id);

        let html_body = StoreApprovalHtml {
            heading,
            shop_name,
            phase: phase.as_str(),
            reason,
            dashboard_url: &dashboard_url,
        }
        .render()?;
        let text_body = StoreApprovalText {
            heading,
            shop_name,
            phase: phase.as_str(),
            reason,
            dashboard_url: &dashboard_url,
        }
        .render()?;

        self.mailer
            .send(&OutgoingEmail {
                to: recipient.to_string(),
                subject: subject.to_string(),
                text_body,
                html_body,
            })
            .await
    }

    /// Issue the gift card, then confirm the order either way.
    async fn send_order_confirmation(&self, item: &OrderItem) -> Result<(), EmailError> {
        let gift_card_sent = self.issue_gift_card(item).await;

        let product_price = item.product_price.to_string();
        let total_amount = item.total_amount.to_string();
        let html_body = OrderConfirmationHtml {
            order_item_id: item.id,
            product_name: &item.product_name,
            quantity: item.quantity,
            product_price: product_price.clone(),
            total_amount: total_amount.clone(),
            status: item.status.as_str(),
            delivery_address: &item.delivery_address,
            city: &item.city,
            zip_code: &item.zip_code,
            state: &item.state,
            country: &item.country,
            gift_card_sent,
        }
        .render()?;
        let text_body = OrderConfirmationText {
            order_item_id: item.id,
            product_name: &item.product_name,
            quantity: item.quantity,
            product_price,
            total_amount,
            status: item.status.as_str(),
            delivery_address: &item.delivery_address,
            city: &item.city,
            zip_code: &item.zip_code,
            state: &item.state,
            country: &item.country,
            gift_card_sent,
        }
        .render()?;

        self.mailer
            .send(&OutgoingEmail {
                to: item.user_email.to_string(),
                subject: format!("Order confirmation #{}", item.id),
                text_body,
                html_body,
            })
            .await
    }

    /// Returns whether a gift card email went out.
    async fn issue_gift_card(&self, item: &OrderItem) -> bool {
        let Some(issuer) = &self.gift_cards else {
            tracing::debug!("Gift cards disabled, skipping");
            return false;
        };

        let card = match issuer.issue(item.id, &item.country).await {
            Ok(card) => card,
            Err(e) => {
                tracing::error!(
                    kind = "gift-card",
                    recipient = %item.user_email,
                    order_item_id = %item.id,
                    error = %e,
                    "Failed to issue gift card"
                );
                return false;
            }
        };

        match self.send_gift_card(item.id, &item.user_email, &card).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    kind = "gift-card",
                    recipient = %item.user_email,
                    error = %e,
                    "Failed to send gift card email"
                );
                false
            }
        }
    }

    async fn send_gift_card(
        &self,
        order_item_id: OrderItemId,
        recipient: &Email,
        card: &GiftCard,
    ) -> Result<(), EmailError> {
        let html_body = GiftCardHtml {
            order_item_id,
            card,
        }
        .render()?;
        let text_body = GiftCardText {
            order_item_id,
            card,
        }
        .render()?;

        self.mailer
            .send(&OutgoingEmail {
                to: recipient.to_string(),
                subject: format!("Your {} gift card", card.title),
                text_body,
                html_body,
            })
            .await
    }
}
