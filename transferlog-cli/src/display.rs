use term_table::row::Row;
use term_table::table_cell::{Alignment as CellAlignment, TableCell};
use term_table::{Table, TableStyle};
use tracing::warn;
use transferlog_provider::{Notifier, SendReceipt, TransactionContext, TransactionRecord};

/// Shows wallet notices on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotice;

impl Notifier for TerminalNotice {
    fn notify(&self, message: &str) {
        warn!(notice = message, "User notice");
        eprintln!("❗ {message}");
    }
}

/// Format a hash to a shortened format (0x1234...5678)
fn format_short_hex(hex: &str) -> String {
    if hex.len() > 12 {
        format!("{}...{}", &hex[..6], &hex[hex.len() - 4..])
    } else {
        hex.to_string()
    }
}

fn header(table: &mut Table, title: &str, span: usize) {
    table.add_row(Row::new(vec![
        TableCell::builder(title)
            .col_span(span)
            .alignment(CellAlignment::Center)
            .build(),
    ]));
}

fn key_value(table: &mut Table, key: &str, value: String) {
    table.add_row(Row::new(vec![
        TableCell::builder(key)
            .alignment(CellAlignment::Right)
            .build(),
        TableCell::builder(value)
            .alignment(CellAlignment::Left)
            .build(),
    ]));
}

/// Account, stored count and loading flag.
pub fn render_status(context: &TransactionContext, rpc_url: &str, has_wallet: bool) -> String {
    let mut table = Table::new();
    table.style = TableStyle::extended();

    header(&mut table, "Transfer Log Status", 2);

    let account = match (has_wallet, context.current_account) {
        (false, _) => "no wallet installed".to_string(),
        (true, None) => "not connected".to_string(),
        (true, Some(address)) => address.to_string(),
    };
    key_value(&mut table, "Account", account);
    key_value(
        &mut table,
        "Transactions",
        context
            .transaction_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    );
    key_value(&mut table, "Loaded", context.transactions.len().to_string());
    key_value(&mut table, "Loading", context.is_loading.to_string());
    key_value(&mut table, "RPC URL", rpc_url.to_owned());

    table.render()
}

pub fn render_receipt(receipt: &SendReceipt) -> String {
    let mut table = Table::new();
    table.style = TableStyle::extended();

    header(&mut table, "✅ Transfer Logged ✅", 2);
    key_value(
        &mut table,
        "Transfer",
        format_short_hex(&receipt.transfer_hash.to_string()),
    );
    key_value(&mut table, "Log", format_short_hex(&receipt.log_hash.to_string()));
    key_value(&mut table, "Count", receipt.transaction_count.to_string());

    table.render()
}

pub fn render_transactions(records: &[TransactionRecord]) -> String {
    let mut table = Table::new();
    table.style = TableStyle::extended();

    if records.is_empty() {
        header(&mut table, "No transactions logged yet", 1);
        return table.render();
    }

    table.add_row(Row::new(
        ["From", "To", "Amount (ETH)", "Keyword", "Message", "Time"]
            .into_iter()
            .map(|title| TableCell::builder(title).alignment(CellAlignment::Center).build())
            .collect::<Vec<_>>(),
    ));

    for record in records {
        table.add_row(Row::new(vec![
            TableCell::new(&record.address_from),
            TableCell::new(&record.address_to),
            TableCell::builder(record.amount.to_string())
                .alignment(CellAlignment::Right)
                .build(),
            TableCell::new(&record.keyword),
            TableCell::new(&record.message),
            TableCell::new(&record.timestamp),
        ]));
    }

    table.render()
}
