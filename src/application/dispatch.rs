use super::commands::{ADD_TO_CART_PREFIX, CHECKOUT, CallbackAction, Command};
use super::deliver;
use super::ledger::CheckoutError;
use super::payments::SettlementOutcome;
use super::Shop;
use crate::domain::ids::{ChatId, ProductId};
use crate::domain::payment::{InvoicePayment, SettlementEvent, WebhookDelivery};
use crate::domain::ports::{Button, Notification, SharedGitRunner};
use crate::domain::product::{NewProduct, ProductPatch};
use crate::error::Result;
use tracing::{debug, instrument, warn};

const UNAUTHORIZED: &str = "Unauthorized access.";
const NO_PENDING_ORDER: &str = "No pending orders found. Please create an order first.";
const ADD_PRODUCT_FORMAT: &str = "Please send product details in the following format:\n\
     name | description | price | stock | image_url";

const HELP: &str = "Available Commands

Shopping:
/products - Browse our product catalog
/cart - View your shopping cart
/pay - Process payment for your order
/paypal - Get PayPal payment link

Support:
/support - Request to talk with a support representative
/end_support - End your support session

General:
/help - Show this help message
/start - Start/restart the bot

Need assistance? Use /support to chat with our team!";

const ADMIN_HELP: &str = "Admin Commands:
/add_product name | description | price | stock | image_url - Add new product
/edit_product <id> field=value ... - Edit existing product
/delete_product <id> - Delete a product
/products - View all products
/view_orders - View all orders
/view_customers - View all customers
/dashboard - View sales dashboard
/support_requests - View support requests
/end_session <user> - End a support session you accepted
/git [command] - Execute git commands
/restart - Restart the bot";

/// An event delivered by the chat transport or a payment provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Command { from: ChatId, text: String },
    Callback { from: ChatId, data: String },
    PreCheckout { from: ChatId },
    InvoicePaid { from: ChatId, payment: InvoicePayment },
    Webhook(WebhookDelivery),
}

/// What the hosting shell needs to know after an event was handled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    pub restart_requested: bool,
    pub pre_checkout_approved: bool,
    pub settlement: Option<SettlementOutcome>,
}

/// Routes inbound events to the shop services and replies through the
/// notifier.
#[derive(Clone)]
pub struct Dispatcher {
    shop: Shop,
    git: SharedGitRunner,
}

impl Dispatcher {
    pub fn new(shop: Shop, git: SharedGitRunner) -> Self {
        Self { shop, git }
    }

    pub fn shop(&self) -> &Shop {
        &self.shop
    }

    /// Handles one event. Only a direct-invoice payment with an unparsable
    /// payload returns an error, which the caller may retry.
    pub async fn handle(&self, inbound: Inbound) -> Result<DispatchOutcome> {
        match inbound {
            Inbound::Command { from, text } => match Command::parse(&text) {
                Some(command) => self.handle_command(from, command).await,
                None => {
                    debug!(from = %from, "ignoring non-command text");
                    Ok(DispatchOutcome::default())
                }
            },
            Inbound::Callback { from, data } => {
                let Ok(action) = data.parse::<CallbackAction>();
                self.handle_callback(from, action).await;
                Ok(DispatchOutcome::default())
            }
            Inbound::PreCheckout { from } => {
                debug!(from = %from, "pre-checkout approved");
                Ok(DispatchOutcome {
                    pre_checkout_approved: true,
                    ..Default::default()
                })
            }
            Inbound::InvoicePaid { from, payment } => {
                debug!(from = %from, "invoice payment received");
                let outcome = self
                    .shop
                    .payments
                    .settle(SettlementEvent::Direct(payment))
                    .await?;
                Ok(DispatchOutcome {
                    settlement: Some(outcome),
                    ..Default::default()
                })
            }
            Inbound::Webhook(delivery) => {
                let outcome = self
                    .shop
                    .payments
                    .settle(SettlementEvent::SignedWebhook(delivery))
                    .await?;
                Ok(DispatchOutcome {
                    settlement: Some(outcome),
                    ..Default::default()
                })
            }
        }
    }

    #[instrument(skip(self, command))]
    async fn handle_command(&self, from: ChatId, command: Command) -> Result<DispatchOutcome> {
        if command.requires_admin() && !self.shop.admins.contains(from) {
            warn!(command = ?command, "non-admin invoked admin command");
            self.reply(from, UNAUTHORIZED).await;
            return Ok(DispatchOutcome::default());
        }

        let mut outcome = DispatchOutcome::default();
        match command {
            Command::Start => {
                let text = if self.shop.admins.contains(from) {
                    "Welcome admin! Use /admin_help to see available commands."
                } else {
                    "Welcome to our store! Use /help to see available commands."
                };
                self.reply(from, text).await;
            }
            Command::Help => self.reply(from, HELP).await,
            Command::Products => self.list_products(from).await,
            Command::Cart => self.show_cart(from).await,
            Command::Pay => self.send_invoice(from).await?,
            Command::PayPal => self.send_payment_link(from).await?,
            Command::Support => {
                self.shop.support.request_support(from).await;
            }
            Command::EndSupport => {
                self.shop.support.end_session(from).await;
            }
            Command::AdminHelp => self.reply(from, ADMIN_HELP).await,
            Command::AddProduct(args) => self.add_product(from, &args).await,
            Command::EditProduct(args) => self.edit_product(from, &args).await,
            Command::DeleteProduct(args) => self.delete_product(from, &args).await,
            Command::Dashboard => self.dashboard(from).await,
            Command::ViewOrders => self.view_orders(from).await,
            Command::ViewCustomers => self.view_customers(from).await,
            Command::SupportRequests => self.support_requests(from).await,
            Command::EndSession(args) => match args.parse::<ChatId>() {
                Ok(customer) => {
                    self.shop
                        .support
                        .end_session_by_admin(from, customer)
                        .await;
                }
                Err(_) => self.reply(from, "Usage: /end_session <user id>").await,
            },
            Command::Git(args) => self.git(from, &args).await,
            Command::Restart => {
                warn!("restart requested");
                self.reply(from, "Bot is restarting...").await;
                outcome.restart_requested = true;
            }
            Command::Unknown(name) => {
                debug!(command = %name, "unknown command");
                self.reply(from, "Unknown command. Use /help to see available commands.")
                    .await;
            }
        }
        Ok(outcome)
    }

    async fn handle_callback(&self, from: ChatId, action: CallbackAction) {
        match action {
            CallbackAction::AddToCart(product_id) => {
                let text = if self.shop.ledger.add_to_cart(from, product_id, 1).await {
                    "Product added to cart!"
                } else {
                    "Failed to add product to cart."
                };
                self.reply(from, text).await;
            }
            CallbackAction::Checkout => {
                let text = match self.shop.ledger.create_order(from).await {
                    Ok(order) => format!(
                        "Order created! Total: {}\nUse /pay or /paypal to complete your purchase.",
                        order.total
                    ),
                    Err(CheckoutError::PendingOrderExists(id)) => format!(
                        "You already have an order awaiting payment (Order #{id}). \
                         Use /pay or /paypal to complete it."
                    ),
                    Err(CheckoutError::UnknownProduct(id)) => format!(
                        "Failed to create order: product {id} is no longer available."
                    ),
                    Err(CheckoutError::TotalOutOfRange) => {
                        "Failed to create order: the order total is too large.".to_string()
                    }
                    Err(CheckoutError::EmptyCart | CheckoutError::UnknownCustomer(_)) => {
                        "Failed to create order.".to_string()
                    }
                };
                self.reply(from, text).await;
            }
            CallbackAction::SupportAccept(customer) => {
                if !self.shop.admins.contains(from) {
                    warn!(from = %from, "non-admin tried to accept a support request");
                    self.reply(from, UNAUTHORIZED).await;
                    return;
                }
                self.shop.support.claim(customer, from).await;
            }
            CallbackAction::Unknown(data) => {
                debug!(from = %from, data = %data, "unknown callback");
            }
        }
    }

    async fn list_products(&self, from: ChatId) {
        let products = self.shop.catalog.list().await;
        if products.is_empty() {
            self.reply(from, "No products available.").await;
            return;
        }
        for product in products {
            let card = Notification::text(
                from,
                format!(
                    "{}\nDescription: {}\nPrice: {}\nStock: {}",
                    product.name, product.description, product.price, product.stock
                ),
            )
            .with_button(Button::new(
                "Add to Cart",
                format!("{ADD_TO_CART_PREFIX}{}", product.id),
            ));
            deliver(&self.shop.notifier, card).await;
        }
    }

    async fn show_cart(&self, from: ChatId) {
        let view = match self.shop.ledger.cart_view(from).await {
            Ok(Some(view)) => view,
            Ok(None) => {
                self.reply(from, "Your cart is empty.").await;
                return;
            }
            Err(e) => {
                warn!(from = %from, error = %e, "cart cannot be priced");
                self.reply(from, "Your cart total is too large to display.")
                    .await;
                return;
            }
        };
        let mut text: String = view
            .lines
            .iter()
            .map(|line| format!("{} x{} - {}", line.name, line.quantity, line.subtotal))
            .collect::<Vec<_>>()
            .join("\n");
        text.push_str(&format!("\n\nTotal: {}", view.total));
        let message = Notification::text(from, text).with_button(Button::new("Checkout", CHECKOUT));
        deliver(&self.shop.notifier, message).await;
    }

    async fn send_invoice(&self, from: ChatId) -> Result<()> {
        if !self.shop.payments.direct_payments_enabled() {
            self.reply(from, "Card payments are not available right now. Try /paypal.")
                .await;
            return Ok(());
        }
        let invoice = match self.shop.payments.issue_invoice(from).await {
            Ok(invoice) => invoice,
            Err(e) => {
                warn!(from = %from, error = %e, "invoice not issued");
                self.reply(
                    from,
                    "This order cannot be paid by card. Please contact /support.",
                )
                .await;
                return Ok(());
            }
        };
        match invoice {
            Some(invoice) => {
                let text = format!(
                    "Invoice for Order #{}: {} {}",
                    invoice.order_id, invoice.amount, invoice.currency
                );
                deliver(
                    &self.shop.notifier,
                    Notification::text(from, text).with_invoice(invoice),
                )
                .await;
            }
            None => self.reply(from, NO_PENDING_ORDER).await,
        }
        Ok(())
    }

    async fn send_payment_link(&self, from: ChatId) -> Result<()> {
        match self.shop.payments.create_payment_link(from).await? {
            Some(link) => {
                self.reply(
                    from,
                    format!(
                        "Please complete your payment using this link:\n{}\n\n\
                         Your order will be confirmed automatically once the payment is completed.",
                        link.url
                    ),
                )
                .await;
            }
            None => self.reply(from, NO_PENDING_ORDER).await,
        }
        Ok(())
    }

    async fn add_product(&self, from: ChatId, args: &str) {
        if args.is_empty() {
            self.reply(from, ADD_PRODUCT_FORMAT).await;
            return;
        }
        match args.parse::<NewProduct>() {
            Ok(new_product) => {
                let product = self.shop.catalog.create(new_product).await;
                self.reply(from, format!("Product added successfully!\nID: {}", product.id))
                    .await;
            }
            Err(e) => self.reply(from, format!("Error adding product: {e}")).await,
        }
    }

    async fn edit_product(&self, from: ChatId, args: &str) {
        let (id, assignments) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
        let Ok(id) = id.parse::<ProductId>() else {
            self.reply(from, "Usage: /edit_product <id> field=value ...")
                .await;
            return;
        };
        let patch = match ProductPatch::parse_assignments(assignments) {
            Ok(patch) if patch.is_empty() => {
                self.reply(from, "Usage: /edit_product <id> field=value ...")
                    .await;
                return;
            }
            Ok(patch) => patch,
            Err(e) => {
                self.reply(from, format!("Error editing product: {e}")).await;
                return;
            }
        };
        let text = if self.shop.catalog.update(id, patch).await {
            format!("Product {id} updated.")
        } else {
            format!("Product {id} not found.")
        };
        self.reply(from, text).await;
    }

    async fn delete_product(&self, from: ChatId, args: &str) {
        let Ok(id) = args.parse::<ProductId>() else {
            self.reply(from, "Usage: /delete_product <id>").await;
            return;
        };
        let text = if self.shop.catalog.delete(id).await {
            format!("Product {id} deleted.")
        } else {
            format!("Product {id} not found.")
        };
        self.reply(from, text).await;
    }

    async fn dashboard(&self, from: ChatId) {
        let stats = self.shop.ledger.revenue_stats().await;
        let text = format!(
            "Store Dashboard\nTotal Revenue: {}\nTotal Orders: {}\nAverage Order Value: {}",
            stats.total_revenue, stats.total_orders, stats.average_order_value
        );
        self.reply(from, text).await;
    }

    async fn view_orders(&self, from: ChatId) {
        let orders = self.shop.ledger.orders().await;
        if orders.is_empty() {
            self.reply(from, "No orders yet.").await;
            return;
        }
        let text = orders
            .iter()
            .map(|o| {
                format!(
                    "Order #{} - user {} - {} - {:?} - {}",
                    o.id,
                    o.customer_id,
                    o.total,
                    o.status,
                    o.created_at.format("%Y-%m-%d %H:%M")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.reply(from, text).await;
    }

    async fn view_customers(&self, from: ChatId) {
        let customers = self.shop.ledger.customers().await;
        if customers.is_empty() {
            self.reply(from, "No customers yet.").await;
            return;
        }
        let text = customers
            .iter()
            .map(|c| {
                format!(
                    "User {} - spent {} - {} item(s) in cart",
                    c.id,
                    c.total_spent,
                    c.cart.len()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.reply(from, text).await;
    }

    async fn support_requests(&self, from: ChatId) {
        let queue = self.shop.support.queue().await;
        if queue.is_empty() {
            self.reply(from, "No pending support requests.").await;
            return;
        }
        let text = queue
            .iter()
            .enumerate()
            .map(|(i, customer)| format!("{}. user {customer}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        self.reply(from, format!("Waiting for support:\n{text}")).await;
    }

    async fn git(&self, from: ChatId, args: &[String]) {
        if args.is_empty() {
            self.reply(from, "Please provide a git command. Example: /git pull")
                .await;
            return;
        }
        let text = match self.git.run(args).await {
            Ok(output) => {
                let mut response = String::new();
                if !output.stdout.is_empty() {
                    response.push_str(&format!("Output:\n{}\n", output.stdout));
                }
                if !output.stderr.is_empty() {
                    response.push_str(&format!("Errors:\n{}\n", output.stderr));
                }
                if response.is_empty() {
                    response = "Command executed successfully with no output.".to_string();
                }
                response
            }
            Err(e) => format!("Error executing git command: {e}"),
        };
        self.reply(from, text).await;
    }

    async fn reply(&self, chat_id: ChatId, text: impl Into<String>) {
        deliver(&self.shop.notifier, Notification::text(chat_id, text)).await;
    }
}
