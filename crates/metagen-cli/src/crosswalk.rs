use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use metagen_catalog::{AssistantStatus, EnrichmentPolicy, Pipeline, PipelineConfig};
use metagen_llm::{AssistantConfig, BackendKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CATALOG_SUFFIX: &str = "_dcat_us.json";

#[derive(Args, Debug)]
pub struct CrosswalkArgs {
    /// Input WSDL file
    pub input: PathBuf,
    /// Output catalog JSON (default: `<input dir>/<stem>_dcat_us.json`)
    pub output: Option<PathBuf>,
    /// Ask an LLM to suggest values for fields the WSDL cannot supply
    #[arg(long)]
    pub ai: bool,
    /// LLM backend: verde (LiteLLM proxy), claude or ollama
    #[arg(long, default_value = "verde")]
    pub bot: BackendKind,
    /// Override the backend's model name
    #[arg(long)]
    pub model: Option<String>,
    /// Directory for gap reports
    #[arg(long, default_value = "docs/reports")]
    pub report_dir: PathBuf,
    /// When to fetch REST metadata: auto (only with --ai), always, never
    #[arg(long, default_value = "auto")]
    pub enrich: EnrichmentPolicy,
    #[arg(long, default_value_t = 30)]
    pub rest_timeout_secs: u64,
    #[arg(long, default_value_t = 120)]
    pub llm_timeout_secs: u64,
}

pub fn default_catalog_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    input.with_file_name(format!("{stem}{CATALOG_SUFFIX}"))
}

pub fn report_file_name(generated_at: DateTime<Utc>) -> String {
    format!("gap_report_{}.md", generated_at.format("%Y-%m-%d_%H%M%S"))
}

fn pipeline_config(args: &CrosswalkArgs) -> PipelineConfig {
    let assistant = args.ai.then(|| {
        let mut config = AssistantConfig::from_env(args.bot)
            .with_timeout(Duration::from_secs(args.llm_timeout_secs));
        if let Some(model) = &args.model {
            config = config.with_model(model.clone());
        }
        config
    });
    PipelineConfig {
        assistant,
        enrichment: args.enrich,
        enrichment_timeout: Duration::from_secs(args.rest_timeout_secs),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

pub fn cmd_crosswalk(args: &CrosswalkArgs) -> Result<()> {
    let generated_at = Utc::now();
    let pipeline = Pipeline::from_config(pipeline_config(args));
    let out = pipeline
        .run_file(&args.input, generated_at)
        .with_context(|| format!("failed to crosswalk {}", args.input.display()))?;

    let catalog_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_catalog_path(&args.input));
    let mut json = out.catalog.to_json_pretty()?;
    json.push('\n');
    write_file(&catalog_path, &json)?;

    let report_path = args.report_dir.join(report_file_name(generated_at));
    write_file(&report_path, &out.report.to_markdown())?;

    let counts = out.report.counts();
    println!(
        "{} {}",
        "Crosswalked".green().bold(),
        args.input.display().to_string().bold()
    );
    println!(
        "  {} mapped, {} AI-filled, {} gaps",
        counts.mapped.to_string().green(),
        counts.ai_filled.to_string().cyan(),
        counts.gaps.to_string().yellow()
    );
    let status = out.run.status_label();
    let status = match out.run.status {
        AssistantStatus::Succeeded => status.green(),
        AssistantStatus::Disabled => status.normal(),
        AssistantStatus::Failed { .. } => status.red(),
    };
    println!("  AI enrichment: {status}");
    println!("{} {}", "wrote".green().bold(), catalog_path.display());
    println!("{} {}", "wrote".green().bold(), report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn catalog_path_sits_next_to_input() {
        assert_eq!(
            default_catalog_path(Path::new("data/EDW_RoadBasic_01_MapServer.wsdl")),
            PathBuf::from("data/EDW_RoadBasic_01_MapServer_dcat_us.json")
        );
        assert_eq!(
            default_catalog_path(Path::new("service.xml")),
            PathBuf::from("service_dcat_us.json")
        );
    }

    #[test]
    fn report_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(report_file_name(at), "gap_report_2025-03-14_092653.md");
    }

    #[test]
    fn crosswalk_writes_both_outputs_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Trails_MapServer.wsdl");
        fs::write(
            &input,
            r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                            xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/">
                 <service name="Trails_MapServer">
                   <port name="p"><soap:address location="https://maps.example.com/arcgis/services/Trails/MapServer"/></port>
                 </service>
               </definitions>"#,
        )
        .unwrap();
        let args = CrosswalkArgs {
            input: input.clone(),
            output: None,
            ai: false,
            bot: BackendKind::Verde,
            model: None,
            report_dir: dir.path().join("reports"),
            enrich: EnrichmentPolicy::Auto,
            rest_timeout_secs: 1,
            llm_timeout_secs: 1,
        };
        cmd_crosswalk(&args).unwrap();

        let catalog = fs::read_to_string(dir.path().join("Trails_MapServer_dcat_us.json")).unwrap();
        assert!(catalog.contains("\"title\": \"Trails\""));
        let reports: Vec<_> = fs::read_dir(dir.path().join("reports")).unwrap().collect();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn malformed_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.wsdl");
        fs::write(&input, "<definitions><service>").unwrap();
        let args = CrosswalkArgs {
            input,
            output: None,
            ai: false,
            bot: BackendKind::Verde,
            model: None,
            report_dir: dir.path().join("reports"),
            enrich: EnrichmentPolicy::Never,
            rest_timeout_secs: 1,
            llm_timeout_secs: 1,
        };
        assert!(cmd_crosswalk(&args).is_err());
        assert!(!dir.path().join("reports").exists());
    }
}
