use crate::domain::order::Order;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct OrderRow<'a> {
    id: String,
    order_id: &'a str,
    amount: Decimal,
    currency: &'a str,
    customer_email: &'a str,
    gateway_reference: &'a str,
    status: &'a str,
    created_at: String,
    updated_at: String,
}

impl<'a> From<&'a Order> for OrderRow<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_id: &order.order_id,
            amount: order.amount.value().normalize(),
            currency: &order.currency,
            customer_email: &order.customer_email,
            gateway_reference: &order.gateway_reference,
            status: order.status.as_str(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

/// Writes order snapshots as CSV, header first.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        let mut rows = 0;
        for order in orders {
            self.writer.serialize(OrderRow::from(order))?;
            rows += 1;
        }
        if rows == 0 {
            self.writer.write_record([
                "id",
                "order_id",
                "amount",
                "currency",
                "customer_email",
                "gateway_reference",
                "status",
                "created_at",
                "updated_at",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
