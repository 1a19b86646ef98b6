use crate::models::{CostHistoryPoint, StockReceipt};

#[derive(Debug, Clone, PartialEq)]
pub struct CostRecalculation {
    pub history: Vec<CostHistoryPoint>,
    pub stock_on_hand: f64,
    pub average_cost: f64,
}

/// Recompute the moving-average unit cost over a chronologically ordered
/// receipt sequence. On the first receipt (or whenever running stock is
/// zero) the average is that receipt's unit cost; afterwards
/// new_avg = (stock * avg + qty * cost) / (stock + qty), and stock
/// accumulates additively.
pub fn recompute_cost_history(receipts: &[StockReceipt]) -> CostRecalculation {
    let mut stock = 0.0_f64;
    let mut average = 0.0_f64;
    let mut history = Vec::with_capacity(receipts.len());

    for receipt in receipts {
        if stock <= 0.0 {
            average = receipt.unit_cost;
        } else {
            average = (stock * average + receipt.quantity * receipt.unit_cost)
                / (stock + receipt.quantity);
        }
        stock += receipt.quantity;

        history.push(CostHistoryPoint {
            receipt_id: receipt.id,
            received_at: receipt.received_at,
            quantity: receipt.quantity,
            unit_cost: receipt.unit_cost,
            stock_after: stock,
            average_cost_after: average,
        });
    }

    CostRecalculation {
        history,
        stock_on_hand: stock,
        average_cost: average,
    }
}

/// Single fold step, used when a new receipt lands on a medication whose
/// running stock and average are already known.
pub fn apply_receipt(stock_on_hand: f64, average_cost: f64, quantity: f64, unit_cost: f64) -> (f64, f64) {
    let new_average = if stock_on_hand <= 0.0 {
        unit_cost
    } else {
        (stock_on_hand * average_cost + quantity * unit_cost) / (stock_on_hand + quantity)
    };
    (stock_on_hand + quantity, new_average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn receipt(days: i64, quantity: f64, unit_cost: f64) -> StockReceipt {
        StockReceipt {
            id: Uuid::new_v4(),
            medication_id: Uuid::new_v4(),
            quantity,
            unit_cost,
            supplier: None,
            reference: None,
            received_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
                + chrono::Duration::days(days),
        }
    }

    #[test]
    fn first_receipt_sets_the_average() {
        let result = recompute_cost_history(&[receipt(0, 100.0, 0.20)]);
        assert_eq!(result.stock_on_hand, 100.0);
        assert_eq!(result.average_cost, 0.20);
    }

    #[test]
    fn average_is_quantity_weighted() {
        // 100 @ 0.20 then 100 @ 0.40 -> 0.30
        let result =
            recompute_cost_history(&[receipt(0, 100.0, 0.20), receipt(1, 100.0, 0.40)]);
        assert_eq!(result.stock_on_hand, 200.0);
        assert!((result.average_cost - 0.30).abs() < 1e-9);
    }

    #[test]
    fn final_average_equals_total_cost_over_total_quantity() {
        let receipts = vec![
            receipt(0, 50.0, 1.00),
            receipt(1, 150.0, 1.20),
            receipt(2, 25.0, 0.80),
            receipt(3, 75.0, 1.50),
        ];
        let result = recompute_cost_history(&receipts);

        let total_quantity: f64 = receipts.iter().map(|r| r.quantity).sum();
        let total_cost: f64 = receipts.iter().map(|r| r.quantity * r.unit_cost).sum();

        assert!((result.stock_on_hand - total_quantity).abs() < 1e-9);
        assert!((result.average_cost - total_cost / total_quantity).abs() < 1e-9);
    }

    #[test]
    fn history_records_every_step() {
        let receipts = vec![receipt(0, 10.0, 2.0), receipt(1, 30.0, 4.0)];
        let result = recompute_cost_history(&receipts);

        assert_eq!(result.history.len(), 2);
        assert_eq!(result.history[0].stock_after, 10.0);
        assert_eq!(result.history[0].average_cost_after, 2.0);
        assert_eq!(result.history[1].stock_after, 40.0);
        assert!((result.history[1].average_cost_after - 3.5).abs() < 1e-9);
    }

    #[test]
    fn empty_sequence_yields_zero_stock() {
        let result = recompute_cost_history(&[]);
        assert_eq!(result.stock_on_hand, 0.0);
        assert_eq!(result.average_cost, 0.0);
        assert!(result.history.is_empty());
    }

    #[test]
    fn zero_running_stock_resets_the_average() {
        // Fully dispensed stock means the next receipt's cost stands alone.
        let (stock, average) = apply_receipt(0.0, 1.75, 40.0, 2.50);
        assert_eq!(stock, 40.0);
        assert_eq!(average, 2.50);
    }
}
