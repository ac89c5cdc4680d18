use vm_domain::catalog::PromptCatalog;
use vm_domain::config::Config;
use vm_providers::util::resolve_api_key;
use vm_transcripts::SqliteTranscriptStore;

use crate::realtime::WebhookVerifier;

/// Run all diagnostic checks and print a summary.
///
/// Returns `true` when every check passes.
pub fn run(config: &Config, config_path: &str) -> bool {
    println!("voxgate doctor");
    println!("==============\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_catalog(config, &mut all_passed);
    check_api_key(config, &mut all_passed);
    check_webhook_secret(config, &mut all_passed);
    check_store(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    all_passed
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
        return;
    }
    print_check("Config validation", false, format!("{} issue(s)", issues.len()));
    for issue in &issues {
        println!("      {issue}");
    }
    *all_passed = false;
}

fn check_catalog(config: &Config, all_passed: &mut bool) {
    match PromptCatalog::load(&config.catalog.path, &config.catalog.default_agent) {
        Ok(catalog) => print_check(
            "Prompt catalog",
            true,
            format!(
                "{} ({} agent(s), {} function(s))",
                config.catalog.path.display(),
                catalog.agent_ids().count(),
                catalog.functions().len()
            ),
        ),
        Err(e) => {
            print_check("Prompt catalog", false, e.to_string());
            *all_passed = false;
        }
    }
}

fn check_api_key(config: &Config, all_passed: &mut bool) {
    match resolve_api_key(&config.provider.auth) {
        Ok(_) => print_check("Provider API key", true, "set".into()),
        Err(e) => {
            print_check("Provider API key", false, e.to_string());
            *all_passed = false;
        }
    }
}

fn check_webhook_secret(config: &Config, all_passed: &mut bool) {
    let env = &config.provider.webhook_secret_env;
    let detail = match std::env::var(env) {
        Ok(secret) if !secret.is_empty() => match WebhookVerifier::new(&secret, 0) {
            Ok(_) => Ok(format!("{env} set")),
            Err(e) => Err(e.to_string()),
        },
        _ => Err(format!("{env} not set")),
    };
    match detail {
        Ok(d) => print_check("Webhook secret", true, d),
        Err(d) => {
            print_check("Webhook secret", false, d);
            *all_passed = false;
        }
    }
}

fn check_store(config: &Config, all_passed: &mut bool) {
    let path = &config.storage.db_path;
    match SqliteTranscriptStore::open(path) {
        Ok(_) => print_check("Transcript store", true, format!("{} (schema ready)", path.display())),
        Err(e) => {
            print_check("Transcript store", false, format!("{}: {e}", path.display()));
            *all_passed = false;
        }
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
