//! Invoice rendering and storage.
//!
//! [`render`] is pure: it lays an [`InvoiceDocument`] out on letter pages and
//! serialises the result with the [`pdf`] writer. It takes the total as given
//! rather than re-deriving it from the lines. [`store`] keeps the rendered
//! grouped (cart) invoices on disk for later download.

pub mod pdf;
pub mod store;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use parlour_core::Price;

use crate::models::{Customer, OrderLine};
use pdf::{DocumentInfo, Font, PAGE_HEIGHT, PAGE_WIDTH, Page, TextRun};

pub use store::{InvoiceStore, InvoiceStoreError};

/// Everything printed on an invoice.
#[derive(Debug, Clone)]
pub struct InvoiceDocument<'a> {
    pub business_name: &'a str,
    pub invoice_id: &'a str,
    pub issued_at: DateTime<Utc>,
    pub customer: &'a Customer,
    pub products: &'a [OrderLine],
    pub total_amount: Decimal,
}

const MARGIN: f64 = 50.0;
const LEADING: f64 = 1.2;
const TITLE_SIZE: f64 = 20.0;
const BODY_SIZE: f64 = 12.0;
const SIGNATURE_SIZE: f64 = 10.0;
const ROW_STEP: f64 = 20.0;

/// Left edges of the Product, Quantity, Unit Price and Total columns.
const COLUMNS: [f64; 4] = [50.0, 300.0, 370.0, 450.0];
const COLUMN_HEADERS: [&str; 4] = ["Product", "Quantity", "Unit Price", "Total"];
const COLUMN_GAP: f64 = 8.0;

/// Render an invoice to PDF bytes.
#[must_use]
pub fn render(doc: &InvoiceDocument<'_>) -> Vec<u8> {
    let info = DocumentInfo {
        title: format!("Invoice {}", doc.invoice_id),
        author: doc.business_name.to_string(),
        created_at: doc.issued_at,
    };
    pdf::write_document(&info, &layout(doc))
}

/// Format an amount as `₹<amount, 2 decimals>`.
fn money(amount: Decimal) -> String {
    Price::inr(amount).to_string()
}

/// Position every text run of the invoice, breaking pages as rows overflow.
fn layout(doc: &InvoiceDocument<'_>) -> Vec<Page> {
    let mut cursor = Cursor::new();

    cursor.centered(
        Font::Bold,
        TITLE_SIZE,
        &format!("{} - Invoice", doc.business_name),
    );
    cursor.skip_line(BODY_SIZE);

    cursor.line(Font::Regular, BODY_SIZE, &format!("Invoice ID: {}", doc.invoice_id));
    cursor.line(
        Font::Regular,
        BODY_SIZE,
        &format!("Date: {}", doc.issued_at.format("%d %b %Y, %H:%M UTC")),
    );
    cursor.skip_line(BODY_SIZE);

    cursor.line(
        Font::Regular,
        BODY_SIZE,
        &format!("Customer Name: {}", doc.customer.name),
    );
    cursor.line(Font::Regular, BODY_SIZE, &format!("Email: {}", doc.customer.email));
    cursor.line(Font::Regular, BODY_SIZE, &format!("Phone: {}", doc.customer.phone));
    cursor.skip_line(BODY_SIZE);

    cursor.table_header();
    for product in doc.products {
        if !cursor.has_room(ROW_STEP) {
            cursor.new_page();
            cursor.table_header();
        }
        let quantity = product.quantity.to_string();
        let unit_price = money(product.unit_price);
        let total = money(product.total_price);
        cursor.row(
            Font::Regular,
            [&product.product_name, &quantity, &unit_price, &total],
        );
    }

    // Total line plus signature need this much space below the table.
    let closing = BODY_SIZE * LEADING * 3.0 + SIGNATURE_SIZE * LEADING * 5.0;
    if !cursor.has_room(closing) {
        cursor.new_page();
    }
    cursor.skip_line(BODY_SIZE);
    cursor.right_aligned(
        Font::Bold,
        BODY_SIZE,
        &format!("Total Amount: {}", money(doc.total_amount)),
    );
    for _ in 0..4 {
        cursor.skip_line(SIGNATURE_SIZE);
    }
    cursor.centered(
        Font::Regular,
        SIGNATURE_SIZE,
        &format!("Signed by {}", doc.business_name),
    );

    cursor.finish()
}

/// Top-down text cursor over a growing list of pages.
struct Cursor {
    pages: Vec<Page>,
    current: Page,
    /// Top of the next line, in PDF user space (origin bottom-left).
    y: f64,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Page::default(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn has_room(&self, height: f64) -> bool {
        self.y - height >= MARGIN
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn place(&mut self, font: Font, size: f64, x: f64, baseline: f64, text: &str) {
        self.current.runs.push(TextRun {
            font,
            size,
            x,
            y: baseline,
            text: text.to_string(),
        });
    }

    fn skip_line(&mut self, size: f64) {
        self.y -= size * LEADING;
    }

    fn line(&mut self, font: Font, size: f64, text: &str) {
        let baseline = self.y - size;
        self.place(font, size, MARGIN, baseline, text);
        self.skip_line(size);
    }

    fn centered(&mut self, font: Font, size: f64, text: &str) {
        let x = (PAGE_WIDTH - font.text_width(text, size)) / 2.0;
        let baseline = self.y - size;
        self.place(font, size, x.max(MARGIN), baseline, text);
        self.skip_line(size);
    }

    fn right_aligned(&mut self, font: Font, size: f64, text: &str) {
        let x = PAGE_WIDTH - MARGIN - font.text_width(text, size);
        let baseline = self.y - size;
        self.place(font, size, x.max(MARGIN), baseline, text);
        self.skip_line(size);
    }

    fn row(&mut self, font: Font, cells: [&str; 4]) {
        let baseline = self.y - BODY_SIZE;
        for (i, cell) in cells.into_iter().enumerate() {
            let right = COLUMNS.get(i + 1).copied().unwrap_or(PAGE_WIDTH - MARGIN);
            let fitted = fit_to_width(cell, font, BODY_SIZE, right - COLUMNS[i] - COLUMN_GAP);
            self.place(font, BODY_SIZE, COLUMNS[i], baseline, &fitted);
        }
        self.y -= ROW_STEP;
    }

    fn table_header(&mut self) {
        self.row(Font::Bold, COLUMN_HEADERS);
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.current);
        self.pages
    }
}

/// Shorten `text` with a trailing ellipsis until it fits `max_width`.
fn fit_to_width(text: &str, font: Font, size: f64, max_width: f64) -> String {
    if font.text_width(text, size) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if font.text_width(&candidate, size) <= max_width {
            return candidate;
        }
    }
    "...".to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use parlour_core::{Email, Phone};

    use super::*;

    fn customer() -> Customer {
        Customer {
            name: "Priya Sharma".to_string(),
            email: Email::parse("priya@example.com").unwrap(),
            phone: Phone::parse("9876543210").unwrap(),
        }
    }

    fn line(name: &str, quantity: i32, unit: i64) -> OrderLine {
        OrderLine {
            product_id: None,
            product_name: name.to_string(),
            quantity,
            unit_price: Decimal::from(unit),
            total_price: Decimal::from(unit * i64::from(quantity)),
        }
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    fn count(haystack: &[u8], needle: &str) -> usize {
        haystack
            .windows(needle.len())
            .filter(|w| *w == needle.as_bytes())
            .count()
    }

    #[test]
    fn test_render_is_deterministic() {
        let customer = customer();
        let products = vec![line("Shampoo", 2, 120), line("Oil", 1, 80)];
        let doc = InvoiceDocument {
            business_name: "Rohini Beauty Parlour",
            invoice_id: "pay_123",
            issued_at: issued_at(),
            customer: &customer,
            products: &products,
            total_amount: Decimal::from(320),
        };

        assert_eq!(render(&doc), render(&doc.clone()));
    }

    #[test]
    fn test_render_contains_every_block() {
        let customer = customer();
        let products = vec![line("Shampoo", 2, 120), line("Oil", 1, 80)];
        let doc = InvoiceDocument {
            business_name: "Rohini Beauty Parlour",
            invoice_id: "pay_123",
            issued_at: issued_at(),
            customer: &customer,
            products: &products,
            total_amount: Decimal::from(320),
        };

        let pdf = render(&doc);

        assert!(contains(&pdf, "(Rohini Beauty Parlour - Invoice) Tj"));
        assert!(contains(&pdf, "(Invoice ID: pay_123) Tj"));
        assert!(contains(&pdf, "(Date: 01 May 2024, 10:30 UTC) Tj"));
        assert!(contains(&pdf, "(Customer Name: Priya Sharma) Tj"));
        assert!(contains(&pdf, "(Email: priya@example.com) Tj"));
        assert!(contains(&pdf, "(Unit Price) Tj"));
        assert!(contains(&pdf, "(Shampoo) Tj"));
        assert!(contains(&pdf, "(Rs.240.00) Tj"));
        assert!(contains(&pdf, "(Total Amount: Rs.320.00) Tj"));
        assert!(contains(&pdf, "(Signed by Rohini Beauty Parlour) Tj"));
        assert!(contains(&pdf, "/Count 1"));
    }

    #[test]
    fn test_total_is_taken_as_given() {
        let customer = customer();
        let products = vec![line("Shampoo", 1, 100)];
        let doc = InvoiceDocument {
            business_name: "Parlour",
            invoice_id: "x",
            issued_at: issued_at(),
            customer: &customer,
            products: &products,
            total_amount: Decimal::new(9_999, 2),
        };

        assert!(contains(&render(&doc), "(Total Amount: Rs.99.99) Tj"));
    }

    #[test]
    fn test_total_line_is_right_aligned() {
        let customer = customer();
        let products = vec![line("Shampoo", 1, 100)];
        let doc = InvoiceDocument {
            business_name: "Parlour",
            invoice_id: "x",
            issued_at: issued_at(),
            customer: &customer,
            products: &products,
            total_amount: Decimal::from(100),
        };

        let pages = layout(&doc);
        let total = pages[0]
            .runs
            .iter()
            .find(|r| r.text.starts_with("Total Amount"))
            .unwrap();
        let right_edge = total.x + Font::Bold.text_width(&total.text, total.size);
        assert!((right_edge - (PAGE_WIDTH - MARGIN)).abs() < 1e-6);
        assert_eq!(total.font, Font::Bold);
    }

    #[test]
    fn test_long_tables_break_pages_and_repeat_header() {
        let customer = customer();
        let products: Vec<OrderLine> = (0..60).map(|i| line(&format!("Item {i}"), 1, 10)).collect();
        let doc = InvoiceDocument {
            business_name: "Parlour",
            invoice_id: "bulk",
            issued_at: issued_at(),
            customer: &customer,
            products: &products,
            total_amount: Decimal::from(600),
        };

        let pages = layout(&doc);
        assert!(pages.len() >= 2);
        for page in &pages[..pages.len() - 1] {
            assert!(page.runs.iter().all(|r| r.y >= MARGIN));
        }

        let pdf = render(&doc);
        assert_eq!(count(&pdf, "(Product) Tj"), pages.len());
        assert!(contains(&pdf, "(Item 59) Tj"));
        assert!(contains(&pdf, &format!("/Count {}", pages.len())));
    }

    #[test]
    fn test_long_product_names_are_truncated() {
        let fitted = fit_to_width(&"Herbal ".repeat(20), Font::Regular, BODY_SIZE, 242.0);
        assert!(fitted.ends_with("..."));
        assert!(Font::Regular.text_width(&fitted, BODY_SIZE) <= 242.0);
        assert_eq!(fit_to_width("Oil", Font::Regular, BODY_SIZE, 242.0), "Oil");
    }
}
