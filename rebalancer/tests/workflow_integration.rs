//! Integration tests for rebalancer workflows against files on disk.

use std::path::{Path, PathBuf};

use pinwheel::{CategoryPath, NOT_APPLICABLE, RowStatus};
use pinwheel_rebalancer::config::Config;
use pinwheel_rebalancer::error::Error;
use pinwheel_rebalancer::workflow::{
    self, PlanOptions, PriceOptions, SunburstOptions, apply_goal_overrides,
};

const ALLOCATION_JSON: &str = r#"{
    "Type": "Portfolio",
    "Name": "Pinwheel",
    "Subclasses": [
        { "Type": "Asset Class", "Name": "Stocks", "Allocation": 3,
          "Subclasses": [
              { "Type": "Ticker", "Name": "FSKAX", "Allocation": 1 },
              { "Type": "Ticker", "Name": "FTIHX", "Allocation": 1 }
          ] },
        { "Type": "Asset Class", "Name": "Cash", "Allocation": 1 }
    ]
}"#;

const BALANCE_CSV: &str = "\
Account,Asset Class,Ticker,Initial Balance
Roth,Stocks,FSKAX,\"$1,000.00\"
Brokerage,Stocks,FSKAX,500
Bank,Cash,,2000
Brokerage,Crypto,BTC-USD,250
";

/// Temp workspace with a config, an allocation file and a balance file.
struct Workspace {
    dir: tempfile::TempDir,
    config: Config,
}

impl Workspace {
    fn new() -> Self {
        Self::with_goal(8000.0, 10)
    }

    fn with_goal(net_worth: f64, periods: i64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pinwheel_allocation.json"), ALLOCATION_JSON).unwrap();
        std::fs::write(dir.path().join("balance.csv"), BALANCE_CSV).unwrap();
        let toml = format!(
            r#"
[investor]
name = "Sam"

[goal]
net_worth = {net_worth:?}
periods = {periods}

[files]
balance = "{balance}"

[logging]
dir = "{logs}"
"#,
            balance = dir.path().join("balance.csv").display(),
            logs = dir.path().join("logs").display(),
        );
        let path = dir.path().join("pinwheel.toml");
        std::fs::write(&path, toml).unwrap();
        let config = Config::load(&path).unwrap();
        Self { dir, config }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn audit_events(&self) -> Vec<String> {
        read_events(&self.config.audit_path())
    }
}

fn read_events(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect()
}

// ============================================================================
// plan
// ============================================================================

#[test]
fn plan_uses_default_allocation_and_configured_balances() {
    let ws = Workspace::new();
    let plan = workflow::run_plan(&ws.config, &PlanOptions::default()).unwrap();

    // FSKAX, FTIHX, Cash, plus the unallocated BTC-USD holding
    assert_eq!(plan.len(), 4);

    let fskax = plan.row(&CategoryPath::new(["Stocks", "FSKAX"])).unwrap();
    assert_eq!(fskax.initial_balance, 1500.0);
    assert!((fskax.goal_balance - 3000.0).abs() < 1e-9);
    assert!((fskax.periodic_contribution - 150.0).abs() < 1e-9);

    let cash = plan
        .row(&CategoryPath::new(["Cash", NOT_APPLICABLE]))
        .unwrap();
    assert!((cash.balance_delta - 0.0).abs() < 1e-9);

    let btc = plan.row(&CategoryPath::new(["Crypto", "BTC-USD"])).unwrap();
    assert_eq!(btc.status, RowStatus::Unallocated);
    assert_eq!(btc.periodic_contribution, -25.0);

    let ftihx = plan.row(&CategoryPath::new(["Stocks", "FTIHX"])).unwrap();
    assert_eq!(ftihx.status, RowStatus::Unfunded);
}

#[test]
fn plan_writes_audit_trail() {
    let ws = Workspace::new();
    workflow::run_plan(&ws.config, &PlanOptions::default()).unwrap();
    assert_eq!(
        ws.audit_events(),
        [
            "run_started",
            "allocation_loaded",
            "balances_loaded",
            "plan_computed",
            "run_completed"
        ]
    );
}

#[test]
fn plan_exports_csv() {
    let ws = Workspace::new();
    let out = ws.path("goals.csv");
    let opts = PlanOptions {
        output: Some(out.clone()),
        ..Default::default()
    };
    workflow::run_plan(&ws.config, &opts).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Asset Class,Ticker,Fraction of Whole,Initial Balance,\
         Goal Balance,Balance Delta,Periodic Contribution"
    );
    assert_eq!(lines.count(), 4);
    assert!(ws.audit_events().contains(&"plan_exported".to_string()));
}

#[test]
fn plan_cli_overrides_goal() {
    let ws = Workspace::new();
    let opts = PlanOptions {
        goal: Some(16000.0),
        periods: Some(4),
        ..Default::default()
    };
    let plan = workflow::run_plan(&ws.config, &opts).unwrap();
    assert_eq!(plan.goal.net_worth, 16000.0);
    let cash = plan
        .row(&CategoryPath::new(["Cash", NOT_APPLICABLE]))
        .unwrap();
    assert!((cash.periodic_contribution - 500.0).abs() < 1e-9);
}

#[test]
fn plan_rejects_zero_period_override() {
    let ws = Workspace::new();
    let opts = PlanOptions {
        periods: Some(0),
        ..Default::default()
    };
    let err = workflow::run_plan(&ws.config, &opts).unwrap_err();
    assert!(matches!(
        err,
        Error::Plan(pinwheel::Error::InvalidGoalHorizon(0))
    ));
}

#[test]
fn failed_plan_still_completes_audit_run() {
    let ws = Workspace::new();
    let opts = PlanOptions {
        periods: Some(0),
        ..Default::default()
    };
    workflow::run_plan(&ws.config, &opts).unwrap_err();

    let text = std::fs::read_to_string(ws.config.audit_path()).unwrap();
    let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
    assert_eq!(last["event"], "run_completed");
    assert_eq!(last["command"], "plan");
    assert_eq!(last["ok"], false);
    assert!(!ws.audit_events().contains(&"plan_computed".to_string()));
}

#[test]
fn relative_config_paths_resolve_next_to_config() {
    let ws = Workspace::new();
    let config_path = ws.path("relative.toml");
    std::fs::write(
        &config_path,
        r#"
[investor]
name = "Sam"

[goal]
net_worth = 8000.0
periods = 10

[files]
balance = "balance.csv"
output = "out/goals.csv"

[logging]
dir = "relative-logs"
"#,
    )
    .unwrap();
    std::fs::create_dir(ws.path("out")).unwrap();
    let config = Config::load(&config_path).unwrap();

    let plan = workflow::run_plan(&config, &PlanOptions::default()).unwrap();
    assert_eq!(plan.len(), 4);
    assert!(ws.path("out").join("goals.csv").is_file());

    let audit = ws.path("relative-logs").join("audit.jsonl");
    assert_eq!(config.audit_path(), audit);
    assert_eq!(read_events(&audit).last().unwrap(), "run_completed");
}

#[test]
fn plan_without_balances_is_missing_input() {
    let mut ws = Workspace::new();
    ws.config.files.balance = None;
    let err = workflow::run_plan(&ws.config, &PlanOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::Plan(pinwheel::Error::MissingInput("balance"))
    ));
}

#[test]
fn plan_missing_allocation_file() {
    let ws = Workspace::new();
    let opts = PlanOptions {
        allocation: Some(ws.path("nope.json")),
        ..Default::default()
    };
    let err = workflow::run_plan(&ws.config, &opts).unwrap_err();
    assert!(matches!(err, Error::Load { what: "allocation", .. }));
}

#[test]
fn plan_balance_file_missing_columns() {
    let ws = Workspace::new();
    let bad = ws.path("bad.csv");
    std::fs::write(&bad, "Asset Class,Initial Balance\nStocks,10\n").unwrap();
    let opts = PlanOptions {
        balance: Some(bad),
        ..Default::default()
    };
    let err = workflow::run_plan(&ws.config, &opts).unwrap_err();
    assert!(matches!(
        err,
        Error::Load {
            what: "balances",
            source: pinwheel::Error::BalanceFormat(_),
            ..
        }
    ));
}

#[test]
fn personal_allocation_file_wins() {
    let ws = Workspace::new();
    std::fs::write(
        ws.path("Sam_allocation.json"),
        r#"{"Type":"Portfolio","Name":"Mine","Subclasses":[
            {"Type":"Asset Class","Name":"Stocks","Allocation":1},
            {"Type":"Asset Class","Name":"Cash","Allocation":1}]}"#,
    )
    .unwrap();
    let table = workflow::show_allocation(&ws.config, None, None).unwrap();
    assert_eq!(table.schema().columns(), ["Asset Class"]);
    assert_eq!(table.len(), 2);
}

#[test]
fn goal_overrides() {
    let base = pinwheel::Goal::new(100.0, 1);
    assert_eq!(apply_goal_overrides(base, Some(1.0), Some(2)), pinwheel::Goal::new(1.0, 2));
}

// ============================================================================
// allocation / template
// ============================================================================

#[test]
fn allocation_writes_csv() {
    let ws = Workspace::new();
    let out = ws.path("allocation.csv");
    workflow::show_allocation(&ws.config, None, Some(&out)).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        [
            "Asset Class,Ticker,Fraction of Whole",
            "Stocks,FSKAX,0.375",
            "Stocks,FTIHX,0.375",
            "Cash,N/A,0.25"
        ]
    );
}

#[test]
fn template_feeds_plan() {
    let ws = Workspace::new();
    let out = ws.path("template.csv");
    let template = workflow::write_template(&ws.config, None, &out, false).unwrap();
    assert_eq!(template.len(), 3);
    assert_eq!(template.total(), 0.0);

    let opts = PlanOptions {
        balance: Some(out),
        ..Default::default()
    };
    let plan = workflow::run_plan(&ws.config, &opts).unwrap();
    assert_eq!(plan.with_status(RowStatus::Allocated).count(), 3);
    assert!((plan.totals().periodic_contribution - 800.0).abs() < 1e-9);
}

#[test]
fn template_force_overwrites() {
    let ws = Workspace::new();
    let out = ws.path("template.csv");
    std::fs::write(&out, "old").unwrap();
    workflow::write_template(&ws.config, None, &out, true).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Asset Class,Ticker,Initial Balance"));
}

// ============================================================================
// prices
// ============================================================================

#[test]
fn prices_align_and_drop_incomplete() {
    let ws = Workspace::new();
    let prices = ws.path("ticker_data");
    std::fs::create_dir(&prices).unwrap();
    std::fs::write(
        prices.join("FSKAX.csv"),
        "Date,Adj Close\n2021-01-04,100\n2021-01-05,101\n2021-01-06,102\n",
    )
    .unwrap();
    std::fs::write(
        prices.join("FTIHX.csv"),
        "Date,Adj Close\n2021-01-05,15\n2021-01-06,null\n",
    )
    .unwrap();

    let out = ws.path("prices.csv");
    let opts = PriceOptions {
        ids: vec!["FSKAX".into(), "FTIHX".into()],
        dir: Some(prices.clone()),
        complete: false,
        output: Some(out.clone()),
    };
    let frame = workflow::compile_prices(&ws.config, &opts).unwrap();
    assert_eq!(frame.len(), 3);
    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().next().unwrap(), "Date,FSKAX,FTIHX");

    let complete = workflow::compile_prices(
        &ws.config,
        &PriceOptions {
            complete: true,
            ..opts
        },
    )
    .unwrap();
    assert_eq!(complete.len(), 1);
}

#[test]
fn prices_missing_ticker() {
    let ws = Workspace::new();
    let opts = PriceOptions {
        ids: vec!["VWO".into()],
        dir: Some(ws.path("ticker_data")),
        ..Default::default()
    };
    assert!(matches!(
        workflow::compile_prices(&ws.config, &opts),
        Err(Error::Prices(_))
    ));
}

// ============================================================================
// charts
// ============================================================================

#[test]
fn sunburst_balances_relabel_duplicate_tickers() {
    let ws = Workspace::new();
    let out = ws.path("sunburst.json");
    let opts = SunburstOptions {
        alternate: Some("Account".into()),
        output: Some(out.clone()),
        ..Default::default()
    };
    let nodes = workflow::chart_sunburst(&ws.config, &opts).unwrap();

    let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    assert!(ids.contains(&"Stocks/Roth"));
    assert!(ids.contains(&"Stocks/Brokerage"));
    assert!(ids.contains(&"Crypto/BTC-USD"));
    let stocks = nodes.iter().find(|n| n.id == "Stocks").unwrap();
    assert_eq!(stocks.value, 1500.0);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), nodes.len());
}

#[test]
fn sunburst_target() {
    let ws = Workspace::new();
    let opts = SunburstOptions {
        target: true,
        output: Some(ws.path("target.json")),
        ..Default::default()
    };
    let nodes = workflow::chart_sunburst(&ws.config, &opts).unwrap();
    assert_eq!(nodes.len(), 4);
}

#[test]
fn pie_for_named_category() {
    let ws = Workspace::new();
    let out = ws.path("pie.json");
    let slices = workflow::chart_pie(&ws.config, None, Some("Stocks"), Some(&out)).unwrap();
    assert_eq!(slices.len(), 2);
    assert!((slices[0].weight - 0.5).abs() < 1e-12);
    assert!(out.exists());
}
