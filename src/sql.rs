use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::field::FieldId;
use crate::record::Record;

/// The game server tables an export can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlTable {
    /// Shop listing: prices per currency and period
    Menu,
    /// Item refunds
    Item,
}

impl SqlTable {
    /// Table name as used in the statements
    pub const fn name(&self) -> &'static str {
        match self {
            SqlTable::Menu => "menu",
            SqlTable::Item => "item",
        }
    }

    /// Column list, in the order values are emitted
    pub const fn columns(&self) -> &'static [&'static str] {
        match self {
            SqlTable::Menu => &[
                "No",
                "Item1",
                "PriceByGoldForW",
                "PriceByGoldForM",
                "PriceByGoldForI",
                "PriceByCashForW",
                "PriceByCashForM",
                "PriceByCashForI",
                "Period1",
                "Volume1",
            ],
            SqlTable::Item => &["No", "Refund_C", "Refund_G", "Refund_T", "Refund_E"],
        }
    }
}

impl fmt::Display for SqlTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for SQL export
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// `Period1` of menu rows, in seconds
    pub period_secs: u32,
    /// `Volume1` of menu rows
    pub volume: u32,
    /// Share of the eternal gold price refunded, in percent
    pub refund_percent: u32,
    /// Comment lines written before the statements (without the `#` prefix)
    pub header: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            period_secs: 86_400,
            volume: 1,
            refund_percent: 60,
            header: vec![format!(
                "Generated by {} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )],
        }
    }
}

/// Quote a value as an SQL string literal
///
/// Single quotes and backslashes are doubled.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Build one `INSERT` statement per record shown in the shop
///
/// Records with `show_in_shop` unset are skipped.
///
/// # Arguments
/// - `records` - The records to export, in file order
/// - `table` - The target table
/// - `options` - Period, volume and refund settings
///
/// # Returns
/// The statements, each terminated by `;`, in record order
pub fn to_sql(records: &[Record], table: SqlTable, options: &ExportOptions) -> Vec<String> {
    let columns = table.columns().join(", ");

    records
        .iter()
        .filter(|r| r.is_visible())
        .map(|record| {
            let values = match table {
                SqlTable::Menu => menu_values(record, options),
                SqlTable::Item => item_values(record, options),
            };
            let values: Vec<String> = values.iter().map(|v| quote_literal(&v.to_string())).collect();

            format!(
                "INSERT INTO {} ({}) VALUES ({});",
                table.name(),
                columns,
                values.join(", ")
            )
        })
        .collect()
}

/// Render a full export: header comments, a blank line, then one statement per line
pub fn to_sql_text(records: &[Record], table: SqlTable, options: &ExportOptions) -> String {
    let mut text = String::new();
    for line in &options.header {
        text.push_str("# ");
        text.push_str(line);
        text.push('\n');
    }
    if !options.header.is_empty() {
        text.push('\n');
    }

    for statement in to_sql(records, table, options) {
        text.push_str(&statement);
        text.push('\n');
    }

    text
}

/// Write a full export to a text file
pub fn to_sql_file<P: AsRef<Path>>(
    records: &[Record],
    table: SqlTable,
    path: P,
    options: &ExportOptions,
) -> Result<()> {
    let path = path.as_ref();
    let text = to_sql_text(records, table, options);

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(text.as_bytes())?;
    writer.flush()?;

    info!(%table, path = %path.display(), "exported SQL");
    Ok(())
}

/// Price of one period and currency, or zero when that sale is disabled
fn offered_price(record: &Record, currency_enabled: FieldId, period: FieldId, price: FieldId) -> i64 {
    if record.get_int(currency_enabled) == Some(1) && record.get_int(period) == Some(1) {
        record.int_or_zero(price)
    } else {
        0
    }
}

fn menu_values(record: &Record, options: &ExportOptions) -> Vec<i64> {
    let gold = |period, price| offered_price(record, FieldId::EnableSaleGold, period, price);
    let cash = |period, price| offered_price(record, FieldId::EnableSaleCash, period, price);
    let code = record.code();

    vec![
        code,
        code,
        gold(FieldId::SellWeekly, FieldId::PriceWeeklyGold),
        gold(FieldId::SellMonthly, FieldId::PriceMonthlyGold),
        gold(FieldId::SellEternal, FieldId::PriceEternalGold),
        cash(FieldId::SellWeekly, FieldId::PriceWeeklyCash),
        cash(FieldId::SellMonthly, FieldId::PriceMonthlyCash),
        cash(FieldId::SellEternal, FieldId::PriceEternalCash),
        options.period_secs as i64,
        options.volume as i64,
    ]
}

fn item_values(record: &Record, options: &ExportOptions) -> Vec<i64> {
    let refund = record
        .int_or_zero(FieldId::PriceEternalGold)
        .saturating_mul(options.refund_percent as i64)
        .div_euclid(100);

    vec![record.code(), refund, refund, refund, refund]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;
    use crate::schema::RecordKind;

    fn shop_record(code: i64) -> Record {
        let mut record = Record::new(RecordKind::Body);
        for (id, value) in [
            (FieldId::AvatarCode, code),
            (FieldId::ShowInShop, 1),
            (FieldId::EnableSaleGold, 1),
            (FieldId::EnableSaleCash, 0),
            (FieldId::SellWeekly, 1),
            (FieldId::SellMonthly, 0),
            (FieldId::SellEternal, 1),
            (FieldId::PriceWeeklyGold, 300),
            (FieldId::PriceMonthlyGold, 900),
            (FieldId::PriceEternalGold, 2_599),
            (FieldId::PriceWeeklyCash, 30),
            (FieldId::PriceEternalCash, 250),
        ] {
            record.set(id, FieldValue::Int(value));
        }
        record
    }

    #[test]
    fn test_menu_statement() {
        let statements = to_sql(&[shop_record(4101)], SqlTable::Menu, &ExportOptions::default());
        assert_eq!(
            statements,
            vec![
                "INSERT INTO menu (No, Item1, PriceByGoldForW, PriceByGoldForM, PriceByGoldForI, \
                 PriceByCashForW, PriceByCashForM, PriceByCashForI, Period1, Volume1) \
                 VALUES ('4101', '4101', '300', '0', '2599', '0', '0', '0', '86400', '1');"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_item_statement_floors_refund() {
        let statements = to_sql(&[shop_record(7)], SqlTable::Item, &ExportOptions::default());
        assert_eq!(
            statements,
            vec![
                "INSERT INTO item (No, Refund_C, Refund_G, Refund_T, Refund_E) \
                 VALUES ('7', '1559', '1559', '1559', '1559');"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_hidden_records_are_skipped() {
        let mut hidden = shop_record(2);
        hidden.set(FieldId::ShowInShop, FieldValue::Int(0));
        let records = vec![shop_record(1), hidden, shop_record(3)];

        let statements = to_sql(&records, SqlTable::Item, &ExportOptions::default());
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("VALUES ('1',"));
        assert!(statements[1].contains("VALUES ('3',"));
    }

    #[test]
    fn test_export_is_deterministic() {
        let records: Vec<Record> = (0..4).map(|i| shop_record(500 + i)).collect();
        let options = ExportOptions::default();

        for table in [SqlTable::Menu, SqlTable::Item] {
            assert_eq!(
                to_sql_text(&records, table, &options),
                to_sql_text(&records, table, &options)
            );
        }
    }

    #[test]
    fn test_text_layout() {
        let options = ExportOptions {
            header: vec!["shop update".to_string()],
            ..Default::default()
        };
        let text = to_sql_text(&[shop_record(1)], SqlTable::Item, &options);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# shop update");
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("INSERT INTO item"));
        assert!(text.ends_with(";\n"));
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal(r"a\b"), r"'a\\b'");
    }
}
