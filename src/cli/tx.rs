use tracing::{error, info};

use crate::cli::Commands;
use crate::contract::LedgerContract;
use crate::error::LedgerError;
use crate::host::{ChaincodeHost, Response, Transaction, TxKind};
use crate::store::StateStore;

/// Parses one script line. Blank lines and `#` comments yield `None`.
///
/// `init` lines carry the account names directly (`init alice bob`); the
/// other kinds name the function first (`invoke transfer alice bob 10`).
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<Transaction>, LedgerError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace().map(str::to_string);
    let invalid = |reason: &str| LedgerError::InvalidScript {
        line: line_no,
        reason: reason.to_string(),
    };
    let kind = match words.next().as_deref() {
        Some("init") => return Ok(Some(Transaction::new(TxKind::Init, "init", words.collect()))),
        Some("invoke") => TxKind::Invoke,
        Some("query") => TxKind::Query,
        Some(_) => return Err(invalid("expected init, invoke or query")),
        None => return Ok(None),
    };
    let function = words.next().ok_or_else(|| invalid("missing function name"))?;
    Ok(Some(Transaction::new(kind, function, words.collect())))
}

pub fn transactions_for(cmd: &Commands) -> Result<Vec<Transaction>, LedgerError> {
    match cmd {
        Commands::Init { account_a, account_b } => Ok(vec![Transaction::new(
            TxKind::Init,
            "init",
            vec![account_a.clone(), account_b.clone()],
        )]),
        Commands::Invoke { function, args } => {
            Ok(vec![Transaction::new(TxKind::Invoke, function.clone(), args.clone())])
        }
        Commands::Query { function, args } => {
            Ok(vec![Transaction::new(TxKind::Query, function.clone(), args.clone())])
        }
        Commands::Run { script, .. } => {
            let content = std::fs::read_to_string(script)
                .map_err(|e| LedgerError::Config(format!("cannot read {}: {}", script, e)))?;
            let mut txs = Vec::new();
            for (idx, line) in content.lines().enumerate() {
                if let Some(tx) = parse_line(idx + 1, line)? {
                    txs.push(tx);
                }
            }
            Ok(txs)
        }
    }
}

pub fn render(resp: &Response, json: bool) -> String {
    let payload = resp
        .payload
        .as_ref()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
    if json {
        serde_json::json!({
            "tx_id": resp.tx_id,
            "payload": payload,
            "writes": resp.writes,
        })
        .to_string()
    } else {
        payload.unwrap_or_else(|| format!("ok (tx {}, {} keys written)", resp.tx_id, resp.writes))
    }
}

/// Executes every transaction of `cmd`, printing each response.
///
/// Stops at the first failure unless `keep_going` is set; the first error is
/// returned either way.
pub fn handle_command<S: StateStore>(
    cmd: &Commands,
    contract: LedgerContract,
    store: S,
    json: bool,
) -> Result<(), LedgerError> {
    let keep_going = matches!(cmd, Commands::Run { keep_going: true, .. });
    let txs = transactions_for(cmd)?;
    let mut host = ChaincodeHost::new(contract, store);
    let mut first_error = None;

    for tx in &txs {
        match host.execute(tx) {
            Ok(resp) => println!("{}", render(&resp, json)),
            Err(e) => {
                error!("{} {} failed: {}", tx.kind, tx.function, e);
                if json {
                    println!("{}", serde_json::json!({ "error": e.to_string() }));
                }
                if !keep_going {
                    return Err(e);
                }
                first_error.get_or_insert(e);
            }
        }
    }
    info!("Executed {} transactions", txs.len());

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
