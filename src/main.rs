use std::str::FromStr;

use clap::{Arg, Command};
use yomisim::logging::{self, LogConfig, LogOutput};
use yomisim::models::Method;
use yomisim::runner;
use yomisim::scenario::ScenarioConfig;

/// 結果の出力形式
#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Text,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(format!("無効な出力形式: {}. 利用可能: text, yaml", s)),
        }
    }
}

fn cli() -> Command {
    Command::new("yomisim")
        .version("0.1.0")
        .about("インプラント埋入精度シミュレータ (Implant Placement Accuracy Simulator)")
        .long_about("フリーハンド・静的ガイド・Yomiロボット支援の3手法で\n\
                     ドリルの角度と深度の偏差を比較し、精度スコアを算出します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("再生するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、既定の照準パスで実行されます。")
        )
        .arg(
            Arg::new("method")
                .short('m')
                .long("method")
                .value_name("METHOD")
                .value_parser(Method::from_str)
                .help("手法を指定 (freehand, static, yomi)")
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("乱数シードを上書き")
        )
        .arg(
            Arg::new("compare")
                .short('c')
                .long("compare")
                .action(clap::ArgAction::SetTrue)
                .help("3手法を同じシードで実行して比較")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .value_parser(OutputFormat::from_str)
                .default_value("text")
                .help("結果の出力形式 (text, yaml)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("DEST")
                .value_parser(LogOutput::from_str)
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベルを直接指定 (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: デバッグ, -vv: ティックごとのトレース)")
        )
}

fn main() {
    let matches = cli().get_matches();

    let verbose_level = matches.get_count("verbose");
    let mut log_config = LogConfig {
        output: *matches
            .get_one::<LogOutput>("log-output")
            .unwrap_or(&LogOutput::Console),
        ..LogConfig::default()
    }
    .with_verbosity(verbose_level);
    if let Some(level) = matches.get_one::<String>("log-level") {
        log_config.level = logging::parse_log_level(level);
    }

    // ガードはプログラム終了まで保持する
    let _log_guard = match logging::init_logging(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            None
        }
    };

    let options = RunOptions {
        scenario_path: matches.get_one::<String>("scenario").cloned(),
        method: matches.get_one::<Method>("method").copied(),
        seed: matches.get_one::<u64>("seed").copied(),
        compare: matches.get_flag("compare"),
        info_only: matches.get_flag("info"),
        format: *matches
            .get_one::<OutputFormat>("format")
            .unwrap_or(&OutputFormat::Text),
    };

    if let Err(e) = run(options) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

struct RunOptions {
    scenario_path: Option<String>,
    method: Option<Method>,
    seed: Option<u64>,
    compare: bool,
    info_only: bool,
    format: OutputFormat,
}

/// シナリオを読み込み、CLIの指定で上書きしてから実行
fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut scenario = match &options.scenario_path {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            tracing::debug!("シナリオファイル読み込み完了: {}", path);
            scenario
        }
        None => ScenarioConfig::builtin(options.method.unwrap_or(Method::Freehand)),
    };

    if let Some(method) = options.method {
        scenario.session.method = method;
    }
    if let Some(seed) = options.seed {
        scenario.sim.seed = Some(seed);
    }

    if options.info_only {
        scenario.print_summary();
        return Ok(());
    }

    // エンジンは単一スレッドの制御下で動かす
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if options.compare {
        let reports = runtime.block_on(runner::run_comparison(&scenario))?;
        match options.format {
            OutputFormat::Text => {
                runner::print_comparison(&reports);
                for report in &reports {
                    println!();
                    runner::print_report(report);
                }
            }
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&reports)?),
        }
    } else {
        let report = runtime.block_on(runner::run_session(&scenario))?;
        match options.format {
            OutputFormat::Text => runner::print_report(&report),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_cli_parses_method_and_seed() {
        let matches = cli()
            .try_get_matches_from(["yomisim", "-m", "yomi", "--seed", "5", "-c", "-f", "yaml"])
            .unwrap();
        assert_eq!(matches.get_one::<Method>("method"), Some(&Method::YomiRobotic));
        assert_eq!(matches.get_one::<u64>("seed"), Some(&5));
        assert!(matches.get_flag("compare"));
        assert_eq!(matches.get_one::<OutputFormat>("format"), Some(&OutputFormat::Yaml));
    }

    #[test]
    fn test_cli_rejects_unknown_method() {
        assert!(cli().try_get_matches_from(["yomisim", "-m", "laser"]).is_err());
        assert!(cli().try_get_matches_from(["yomisim", "-c", "-i"]).is_err());
    }

    #[test]
    fn test_run_builtin_scenario() {
        let options = RunOptions {
            scenario_path: None,
            method: Some(Method::StaticGuided),
            seed: Some(3),
            compare: false,
            info_only: false,
            format: OutputFormat::Text,
        };
        assert!(run(options).is_ok());
    }

    #[test]
    fn test_run_missing_scenario_fails() {
        let options = RunOptions {
            scenario_path: Some("scenarios/missing.yaml".to_string()),
            method: None,
            seed: None,
            compare: false,
            info_only: true,
            format: OutputFormat::Text,
        };
        assert!(run(options).is_err());
    }
}
