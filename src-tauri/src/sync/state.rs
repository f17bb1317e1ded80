use crate::api::{Amount, OrderRecord};

/// Last revenue pushed to the UI. Only the scalar is retained between
/// cycles; snapshots themselves are replaced wholesale.
#[derive(Debug, Default, Clone)]
pub struct RevenueCell {
    previous: Option<Amount>,
}

impl RevenueCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `revenue` differs from the stored value (an empty
    /// baseline always differs) and records it. Equal values are a no-op.
    pub fn observe(&mut self, revenue: &Amount) -> bool {
        if self.previous.as_ref() == Some(revenue) {
            return false;
        }
        self.previous = Some(revenue.clone());
        true
    }

    pub fn previous(&self) -> Option<&Amount> {
        self.previous.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdersChange {
    /// Empty list, or the head is the one already seen.
    Unchanged,
    /// First head ever observed. Orders that predate the app are not news.
    Baseline,
    /// The head moved since the last observation.
    NewHead,
}

impl OrdersChange {
    pub fn should_push(self) -> bool {
        !matches!(self, OrdersChange::Unchanged)
    }
}

/// `order_id` of the newest order seen. The API returns orders newest first,
/// so a new head means at least one new order.
#[derive(Debug, Default, Clone)]
pub struct HeadOrderCell {
    previous: Option<String>,
}

impl HeadOrderCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, orders: &[OrderRecord]) -> OrdersChange {
        let Some(head) = orders.first() else {
            return OrdersChange::Unchanged;
        };

        match self.previous.replace(head.order_id.clone()) {
            None => OrdersChange::Baseline,
            Some(previous) if previous == head.order_id => OrdersChange::Unchanged,
            Some(_) => OrdersChange::NewHead,
        }
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }
}

#[cfg(test)]
pub(crate) fn order(order_id: &str) -> OrderRecord {
    OrderRecord {
        order_id: order_id.to_string(),
        id: serde_json::json!(format!("int-{order_id}")),
        created_at: "2024-03-05 10:00:00".into(),
        total_amount: Amount::from("25.00"),
        currency_paid_in_symbol: "£".into(),
        email: "buyer@example.com".into(),
        is_unread: true,
    }
}
