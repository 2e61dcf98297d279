use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const EMPTY_ORDER_SUMMARY: &str = "No items in your order yet.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_name: String,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// Order lines keyed by product name, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Order {
    lines: Vec<OrderLine>,
}

impl Order {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, product_name: &str) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.product_name == product_name)
    }

    /// Sets the line for `line.product_name`. An existing line keeps its
    /// position and takes the new quantity and timestamp.
    pub fn upsert(&mut self, line: OrderLine) -> &OrderLine {
        let position =
            self.lines.iter().position(|existing| existing.product_name == line.product_name);
        match position {
            Some(index) => {
                self.lines[index] = line;
                &self.lines[index]
            }
            None => {
                self.lines.push(line);
                let last = self.lines.len() - 1;
                &self.lines[last]
            }
        }
    }

    pub fn remove(&mut self, product_name: &str) -> Option<OrderLine> {
        let index = self.lines.iter().position(|line| line.product_name == product_name)?;
        Some(self.lines.remove(index))
    }

    pub fn summary(&self) -> String {
        if self.lines.is_empty() {
            return EMPTY_ORDER_SUMMARY.to_string();
        }

        let mut summary = String::from("Current Order:\n");
        for line in &self.lines {
            summary.push_str(&format!("- {} (Qty: {})\n", line.product_name, line.quantity));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Order, OrderLine, EMPTY_ORDER_SUMMARY};

    fn line(name: &str, quantity: u32) -> OrderLine {
        OrderLine { product_name: name.to_string(), quantity, added_at: Utc::now() }
    }

    #[test]
    fn upsert_overwrites_quantity_in_place() {
        let mut order = Order::new();
        order.upsert(line("Flyer Pack", 3));
        order.upsert(line("Door Hangers", 1));
        order.upsert(line("Flyer Pack", 5));

        assert_eq!(order.len(), 2);
        assert_eq!(order.lines()[0].product_name, "Flyer Pack");
        assert_eq!(order.lines()[0].quantity, 5);
    }

    #[test]
    fn remove_reports_missing_lines() {
        let mut order = Order::new();
        order.upsert(line("Flyer Pack", 3));

        assert!(order.remove("Nonexistent").is_none());
        assert_eq!(order.remove("Flyer Pack").map(|removed| removed.quantity), Some(3));
        assert!(order.is_empty());
    }

    #[test]
    fn summary_lists_lines_in_insertion_order() {
        let mut order = Order::new();
        assert_eq!(order.summary(), EMPTY_ORDER_SUMMARY);

        order.upsert(line("Yard Sign", 2));
        order.upsert(line("Flyer Pack", 4));

        assert_eq!(
            order.summary(),
            "Current Order:\n- Yard Sign (Qty: 2)\n- Flyer Pack (Qty: 4)\n"
        );
    }

    #[test]
    fn serializes_as_a_plain_line_array() {
        let mut order = Order::new();
        order.upsert(line("Flyer Pack", 1));

        let value = serde_json::to_value(&order).expect("serialize order");
        assert!(value.is_array());
        assert_eq!(value[0]["product_name"], "Flyer Pack");
        assert_eq!(value[0]["quantity"], 1);
    }
}
