use std::path::Path;

use anyhow::Result;
use ooxml::config::{MergeEngineKind, OoxmlConfig};
use ooxml_git::GitCli;
use serde::Serialize;

use crate::format::OutputFormat;

#[derive(Serialize)]
struct DoctorEnvelope {
    checks: Vec<DoctorCheck>,
    all_ok: bool,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<String>,
}

impl DoctorCheck {
    fn new(name: &str, status: &str, message: String, fix: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            status: status.to_string(),
            message,
            fix,
        }
    }
}

fn print_check(check: &DoctorCheck) {
    let prefix = match check.status.as_str() {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "fail" => "[FAIL]",
        _ => "[???]",
    };
    println!("{} {}", prefix, check.message);
    if let Some(fix) = &check.fix {
        println!("       {fix}");
    }
}

/// Check the git installation and the configuration file
pub fn run(config_path: &Path, format: OutputFormat) -> Result<()> {
    let mut checks = Vec::new();

    let config = match OoxmlConfig::load(config_path) {
        Ok(config) => {
            let message = if config_path.exists() {
                format!("config: {}", config_path.display())
            } else {
                format!("config: {} not found, using defaults", config_path.display())
            };
            checks.push(DoctorCheck::new("config", "ok", message, None));
            config
        }
        Err(e) => {
            checks.push(DoctorCheck::new(
                "config",
                "fail",
                format!("config: {e}"),
                Some("Fix the file or point --config at another one".to_string()),
            ));
            OoxmlConfig::default()
        }
    };

    checks.push(check_git(&config.merge.git_binary, config.merge.engine));
    checks.push(DoctorCheck::new(
        "merge",
        "ok",
        format!(
            "merge: {} engine, {}",
            config.merge.engine, config.merge.conflict_policy
        ),
        None,
    ));
    checks.push(check_macros(&config));

    let all_ok = checks.iter().all(|c| c.status != "fail");

    match format {
        OutputFormat::Json => {
            let envelope = DoctorEnvelope { checks, all_ok };
            println!("{}", format.serialize(&envelope)?);
        }
        OutputFormat::Text => {
            println!("ooxml doctor");
            println!("============");
            println!();

            for check in &checks {
                print_check(check);
            }

            println!();
            if all_ok {
                println!("All checks passed!");
            } else {
                println!("Some checks failed. See above for details.");
            }
        }
    }

    Ok(())
}

fn check_git(binary: &str, engine: MergeEngineKind) -> DoctorCheck {
    match GitCli::version(binary) {
        Ok(version) => DoctorCheck::new("git", "ok", format!("git: {version}"), None),
        // Only automerge with the git engine and prepare-merge need git.
        Err(e) => DoctorCheck::new(
            "git",
            if engine == MergeEngineKind::Git {
                "fail"
            } else {
                "warn"
            },
            format!("git: {e}"),
            Some(format!(
                "Install git (https://git-scm.com/downloads), set merge.git_binary, or set merge.engine = \"in-process\" (currently \"{engine}\")"
            )),
        ),
    }
}

fn check_macros(config: &OoxmlConfig) -> DoctorCheck {
    let macros = &config.macros;
    if !macros.is_configured() {
        return DoctorCheck::new(
            "macros",
            "ok",
            "macros: no export/import commands configured".to_string(),
            None,
        );
    }
    let describe = |argv: &[String]| {
        argv.first()
            .map_or_else(|| "(none)".to_string(), |program| format!("'{program}'"))
    };
    DoctorCheck::new(
        "macros",
        "ok",
        format!(
            "macros: export via {}, import via {}",
            describe(&macros.export_command),
            describe(&macros.import_command)
        ),
        None,
    )
}
