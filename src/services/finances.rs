use chrono::NaiveDate;
use serde::Serialize;

use crate::repository::invoices::InvoiceRow;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinanceSummary {
    pub total_receivables: f64,
    pub total_overdue: f64,
    pub total_current: f64,
}

/// Receivables roll-up over the invoice list. An invoice is receivable when
/// it is unpaid and not cancelled; overdue additionally requires a due date
/// strictly before `today`.
pub fn summarize_invoices(invoices: &[InvoiceRow], today: NaiveDate) -> FinanceSummary {
    let mut total_receivables = 0.0;
    let mut total_overdue = 0.0;

    for invoice in invoices {
        let unpaid = invoice.payment_status.as_deref() == Some("Not paid");
        let cancelled = invoice.invoice_status.as_deref() == Some("Cancelled");
        if !unpaid || cancelled {
            continue;
        }
        total_receivables += invoice.invoice_amount;
        if invoice.due_date.is_some_and(|due| due < today) {
            total_overdue += invoice.invoice_amount;
        }
    }

    FinanceSummary {
        total_receivables,
        total_overdue,
        total_current: total_receivables - total_overdue,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::summarize_invoices;
    use crate::repository::invoices::InvoiceRow;

    fn invoice(
        amount: f64,
        payment_status: &str,
        invoice_status: &str,
        due_date: Option<NaiveDate>,
    ) -> InvoiceRow {
        InvoiceRow {
            id: Uuid::new_v4(),
            invoice_number: "INV-001".to_string(),
            invoice_amount: amount,
            invoice_status: Some(invoice_status.to_string()),
            payment_status: Some(payment_status.to_string()),
            date_issued: None,
            due_date,
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn receivables_exclude_paid_and_cancelled() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let overdue_date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let future_date = NaiveDate::from_ymd_opt(2026, 9, 15).unwrap();

        let invoices = vec![
            invoice(1000.0, "Not paid", "Sent", Some(overdue_date)),
            invoice(500.0, "Not paid", "Sent", Some(future_date)),
            invoice(250.0, "Not paid", "Cancelled", Some(overdue_date)),
            invoice(900.0, "Paid", "Paid", Some(overdue_date)),
            invoice(300.0, "Not paid", "Sent", None),
        ];

        let summary = summarize_invoices(&invoices, today);
        assert_eq!(summary.total_receivables, 1800.0);
        assert_eq!(summary.total_overdue, 1000.0);
        assert_eq!(summary.total_current, 800.0);
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let invoices = vec![invoice(100.0, "Not paid", "Sent", Some(today))];
        let summary = summarize_invoices(&invoices, today);
        assert_eq!(summary.total_overdue, 0.0);
        assert_eq!(summary.total_current, 100.0);
    }
}
