//! Order documents.
//!
//! An order is an immutable snapshot of a cart at purchase time: its
//! lines and amounts never change after creation, only the payment and
//! delivery status fields do.

use chrono::{DateTime, Utc};
use common::{BookId, CurrencyCode, Money, OrderId, Price, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// The nominal flow is `pending → processing → shipped → delivered`;
/// `cancelled` is the off-ramp for orders that never reach delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("Unknown order status: {other}")),
        }
    }
}

/// Accepted payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    Stripe,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Returns the wire name of the payment method.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "paypal" => Ok(PaymentMethod::Paypal),
            "stripe" => Ok(PaymentMethod::Stripe),
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(format!("Unknown payment method: {other}")),
        }
    }
}

/// Destination address for an order. All fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone_number: String,
}

impl ShippingAddress {
    /// Returns the name of the first empty required field, if any.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        let fields = [
            ("full_name", &self.full_name),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
            ("phone_number", &self.phone_number),
        ];
        fields
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
    }
}

/// Payment processor result recorded when an order is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub id: String,
    pub status: String,
    pub update_time: String,
    pub email_address: String,
}

/// Immutable copy of a cart line frozen into an order at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub book_id: BookId,
    pub title: String,
    pub quantity: u32,
    pub price: Price,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(book_id: BookId, title: impl Into<String>, quantity: u32, price: Price) -> Self {
        Self {
            book_id,
            title: title.into(),
            quantity,
            price,
        }
    }

    /// Returns the total price for this line (quantity × unit price).
    pub fn line_total(&self) -> Money {
        self.price.amount.multiply(self.quantity)
    }
}

/// Everything needed to create an order; the total is derived from the
/// lines at construction.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub currency: CurrencyCode,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub tax_amount: Money,
    pub shipping_amount: Money,
}

/// A placed order.
///
/// Fields are private: line items and amounts are frozen at creation,
/// and the status fields change only through the explicit transition
/// methods below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    lines: Vec<OrderLine>,
    total_amount: Money,
    currency: CurrencyCode,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    payment: Option<PaymentReceipt>,
    tax_amount: Money,
    shipping_amount: Money,
    status: OrderStatus,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending, unpaid order from a draft.
    ///
    /// The total amount is computed from the draft's lines.
    pub fn create(draft: OrderDraft, now: DateTime<Utc>) -> Self {
        let total_amount = draft.lines.iter().map(OrderLine::line_total).sum();
        Self {
            id: OrderId::new(),
            user_id: draft.user_id,
            lines: draft.lines,
            total_amount,
            currency: draft.currency,
            shipping_address: draft.shipping_address,
            payment_method: draft.payment_method,
            payment: None,
            tax_amount: draft.tax_amount,
            shipping_amount: draft.shipping_amount,
            status: OrderStatus::Pending,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            tracking_number: None,
            created_at: now,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the frozen order lines.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the sum of the line totals at purchase time.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment(&self) -> Option<&PaymentReceipt> {
        self.payment.as_ref()
    }

    pub fn tax_amount(&self) -> Money {
        self.tax_amount
    }

    pub fn shipping_amount(&self) -> Money {
        self.shipping_amount
    }

    /// Returns total + tax + shipping.
    pub fn grand_total(&self) -> Money {
        self.total_amount + self.tax_amount + self.shipping_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_delivered(&self) -> bool {
        self.is_delivered
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Records a successful payment and moves the order to processing.
    pub fn mark_paid(&mut self, receipt: PaymentReceipt, at: DateTime<Utc>) {
        self.is_paid = true;
        self.paid_at = Some(at);
        self.status = OrderStatus::Processing;
        self.payment = Some(receipt);
    }

    /// Sets the order status. Delivery bookkeeping is handled by
    /// [`Order::mark_delivered`].
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    /// Marks the order delivered.
    pub fn mark_delivered(&mut self, at: DateTime<Utc>) {
        self.status = OrderStatus::Delivered;
        self.is_delivered = true;
        self.delivered_at = Some(at);
    }

    /// Sets the shipment tracking number.
    pub fn set_tracking_number(&mut self, tracking_number: impl Into<String>) {
        self.tracking_number = Some(tracking_number.into());
    }
}
