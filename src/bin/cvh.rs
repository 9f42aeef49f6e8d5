//! CVH CLI - Command-line interface for the CVH engine
//!
//! Commands:
//! - score: Evaluate a batch of raw sample records into a CVH summary
//! - aggregate: Bucket and reduce quantity records over calendar intervals
//! - validate: Validate raw sample record schema
//! - doctor: Diagnose engine health and configuration
//! - schema: Print schema information

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use cvh_engine::aggregate::{aggregate, AggregationKind, AggregationStrategy, BucketInterval};
use cvh_engine::schema::{RawSampleAdapter, RawSampleRecord, SCHEMA_VERSION};
use cvh_engine::types::{QuantitySample, SampleType, TimeRange};
use cvh_engine::{score_records, CvhSummary, EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// CVH - Cardiovascular health scoring over portable health samples
#[derive(Parser)]
#[command(name = "cvh")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score health samples into a cardiovascular health summary", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate raw sample records into a CVH summary
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Evaluation instant (RFC 3339); defaults to now
        #[arg(long)]
        evaluated_at: Option<String>,
    },

    /// Bucket and reduce quantity records over calendar intervals
    Aggregate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Sample type to aggregate (e.g. "step_count")
        #[arg(long)]
        sample_type: String,

        /// Reduction applied within each bucket
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Calendar interval of each bucket
        #[arg(long, value_enum)]
        interval: IntervalArg,

        /// First bucket boundary (RFC 3339); defaults to the range start
        #[arg(long)]
        anchor: Option<String>,

        /// Range start (RFC 3339); defaults to the earliest sample start
        #[arg(long)]
        start: Option<String>,

        /// Range end (RFC 3339); defaults to the latest sample end
        #[arg(long)]
        end: Option<String>,
    },

    /// Validate raw sample record schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine health and configuration
    Doctor {
        /// Check an input file parses and validates
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON
    Ndjson,
    /// JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Sum,
    Average,
    Min,
    Max,
}

impl From<KindArg> for AggregationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Sum => AggregationKind::Sum,
            KindArg::Average => AggregationKind::Average,
            KindArg::Min => AggregationKind::Min,
            KindArg::Max => AggregationKind::Max,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum IntervalArg {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl From<IntervalArg> for BucketInterval {
    fn from(interval: IntervalArg) -> Self {
        match interval {
            IntervalArg::Hour => BucketInterval::Hour,
            IntervalArg::Day => BucketInterval::Day,
            IntervalArg::Week => BucketInterval::Week,
            IntervalArg::Month => BucketInterval::Month,
            IntervalArg::Year => BucketInterval::Year,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (mhc.raw_sample.v1)
    Input,
    /// Output schema (the CVH summary envelope)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CvhCliError> {
    match cli.command {
        Commands::Score {
            input,
            output,
            input_format,
            output_format,
            evaluated_at,
        } => cmd_score(&input, &output, input_format, output_format, evaluated_at.as_deref()),

        Commands::Aggregate {
            input,
            output,
            input_format,
            output_format,
            sample_type,
            kind,
            interval,
            anchor,
            start,
            end,
        } => cmd_aggregate(
            &input,
            &output,
            input_format,
            output_format,
            &sample_type,
            kind.into(),
            interval.into(),
            anchor.as_deref(),
            start.as_deref(),
            end.as_deref(),
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { input, json } => cmd_doctor(input.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

/// Summary wrapped with producer provenance for downstream consumers
#[derive(serde::Serialize)]
struct ScoreEnvelope {
    producer: String,
    version: String,
    cvh_score: Option<f64>,
    coverage: usize,
    summary: CvhSummary,
}

fn cmd_score(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    evaluated_at: Option<&str>,
) -> Result<(), CvhCliError> {
    let records = read_records(input, &input_format)?;
    if records.is_empty() {
        return Err(CvhCliError::NoRecords);
    }

    let evaluated_at = match evaluated_at {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };

    let summary = score_records(&records, evaluated_at)?;
    let envelope = ScoreEnvelope {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        cvh_score: summary.cvh_score(),
        coverage: summary.coverage(),
        summary,
    };

    write_output(output, &format_one(&envelope, &output_format)?)
}

#[allow(clippy::too_many_arguments)]
fn cmd_aggregate(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    sample_type: &str,
    kind: AggregationKind,
    interval: BucketInterval,
    anchor: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), CvhCliError> {
    let records = read_records(input, &input_format)?;
    let sample_type = parse_sample_type(sample_type)?;

    let samples: Vec<QuantitySample> = quantity_samples_of_type(&records, &sample_type)?;
    if samples.is_empty() {
        return Err(CvhCliError::NoSamples);
    }

    let range_start = match start {
        Some(raw) => parse_instant(raw)?,
        None => samples
            .iter()
            .map(|s| s.start)
            .min()
            .ok_or(CvhCliError::NoSamples)?,
    };
    let range_end = match end {
        Some(raw) => parse_instant(raw)?,
        None => samples
            .iter()
            .map(|s| s.end)
            .max()
            .ok_or(CvhCliError::NoSamples)?,
    };
    if range_end < range_start {
        return Err(CvhCliError::ParseError(
            "range end precedes range start".to_string(),
        ));
    }
    let anchor = match anchor {
        Some(raw) => parse_instant(raw)?,
        None => range_start,
    };

    let range = TimeRange::new(range_start, range_end);
    let strategy = AggregationStrategy::new(kind, interval);
    let buckets = aggregate(&samples, &strategy, anchor, &range);

    write_output(output, &format_many(&buckets, &output_format)?)
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), CvhCliError> {
    let records = read_records(input, &input_format)?;
    let results = RawSampleAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                record_id: r.record_id.map(|id| id.to_string()),
                error: r.error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (index {}): {}",
                    err.record_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(CvhCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(input: Option<&std::path::Path>, json: bool) -> Result<(), CvhCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(input_path) = input {
        if input_path.exists() {
            match fs::read_to_string(input_path) {
                Ok(content) => match RawSampleAdapter::parse_ndjson(&content) {
                    Ok(records) => {
                        let invalid = RawSampleAdapter::validate_records(&records).len();
                        if invalid == 0 {
                            checks.push(DoctorCheck {
                                name: "input".to_string(),
                                status: CheckStatus::Ok,
                                message: format!("{} records, all valid", records.len()),
                            });
                        } else {
                            checks.push(DoctorCheck {
                                name: "input".to_string(),
                                status: CheckStatus::Error,
                                message: format!(
                                    "{} of {} records failed validation",
                                    invalid,
                                    records.len()
                                ),
                            });
                        }
                    }
                    Err(e) => {
                        checks.push(DoctorCheck {
                            name: "input".to_string(),
                            status: CheckStatus::Error,
                            message: format!("Cannot parse input: {}", e),
                        });
                    }
                },
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "input".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot read input file: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "input".to_string(),
                status: CheckStatus::Warning,
                message: "Input file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (batch mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("CVH Doctor Report");
        println!("=================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CvhCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), CvhCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("The mhc.raw_sample.v1 schema supports three record kinds:");
                println!();
                println!("1. quantity - Single numeric measurement with a unit");
                println!("   - body_mass, height, body_mass_index");
                println!("   - exercise_minutes, step_count, heart_rate");
                println!("   - diet_score, nicotine_exposure, blood_lipids, blood_glucose");
                println!();
                println!("2. blood_pressure - Correlated systolic/diastolic reading (mmHg)");
                println!();
                println!("3. sleep_stage - Sleep-stage category over a time span");
                println!("   - in_bed, awake, asleep_core, asleep_deep, asleep_rem,");
                println!("     asleep_unspecified");
                println!();
                println!("All timestamps are RFC 3339 UTC; end must not precede start.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: CVH summary envelope");
                println!();
                println!("The score command emits:");
                println!();
                println!("- producer, version: engine provenance");
                println!("- cvh_score: composite 0-1 score, null below minimum coverage");
                println!("- coverage: number of factors that resolved (out of 8)");
                println!("- summary: per-factor results, each containing:");
                println!("  - factor, value, score, time_range");
                println!("  - absent factors carry null value and score");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_records(
    input: &PathBuf,
    input_format: &InputFormat,
) -> Result<Vec<RawSampleRecord>, CvhCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = match input_format {
        InputFormat::Ndjson => RawSampleAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => RawSampleAdapter::parse_array(&input_data)?,
    };
    Ok(records)
}

fn write_output(output: &PathBuf, data: &str) -> Result<(), CvhCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
        Ok(())
    } else {
        fs::write(output, data)?;
        Ok(())
    }
}

fn format_one<T: serde::Serialize>(
    value: &T,
    format: &OutputFormat,
) -> Result<String, CvhCliError> {
    match format {
        OutputFormat::Ndjson | OutputFormat::Json => Ok(serde_json::to_string(value)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)? + "\n"),
    }
}

fn format_many<T: serde::Serialize>(
    values: &[T],
    format: &OutputFormat,
) -> Result<String, CvhCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for value in values {
                lines.push(serde_json::to_string(value)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(values)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(values)?),
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, CvhCliError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CvhCliError::ParseError(format!("Invalid RFC 3339 instant '{}': {}", raw, e)))
}

fn parse_sample_type(raw: &str) -> Result<SampleType, CvhCliError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|e| CvhCliError::ParseError(format!("Invalid sample type '{}': {}", raw, e)))
}

fn quantity_samples_of_type(
    records: &[RawSampleRecord],
    sample_type: &SampleType,
) -> Result<Vec<QuantitySample>, CvhCliError> {
    for (idx, record) in records.iter().enumerate() {
        if let Err(e) = record.validate() {
            return Err(CvhCliError::ParseError(format!(
                "Invalid record at index {}: {}",
                idx, e
            )));
        }
    }

    Ok(records
        .iter()
        .filter_map(|record| match &record.payload {
            cvh_engine::schema::Payload::Quantity { quantity }
                if &quantity.sample_type == sample_type =>
            {
                Some(QuantitySample::new(
                    quantity.sample_type.clone(),
                    quantity.unit.clone(),
                    quantity.value,
                    record.start,
                    record.end,
                ))
            }
            _ => None,
        })
        .collect())
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "mhc.raw_sample.v1",
        "description": "Portable health sample record schema",
        "type": "object",
        "required": ["schema_version", "start", "end", "record_kind", "payload"],
        "properties": {
            "schema_version": {
                "type": "string",
                "const": "mhc.raw_sample.v1"
            },
            "record_id": { "type": "string", "format": "uuid" },
            "start": { "type": "string", "format": "date-time" },
            "end": { "type": "string", "format": "date-time" },
            "record_kind": {
                "type": "string",
                "enum": ["quantity", "blood_pressure", "sleep_stage"]
            },
            "payload": {
                "type": "object",
                "properties": {
                    "quantity": {
                        "type": "object",
                        "required": ["type", "value", "unit"],
                        "properties": {
                            "type": { "type": "string" },
                            "value": { "type": "number" },
                            "unit": { "type": "string" }
                        }
                    },
                    "blood_pressure": {
                        "type": "object",
                        "required": ["systolic", "diastolic"],
                        "properties": {
                            "systolic": { "type": "number" },
                            "diastolic": { "type": "number" }
                        }
                    },
                    "sleep_stage": {
                        "type": "object",
                        "required": ["stage"],
                        "properties": {
                            "stage": { "type": "string" }
                        }
                    }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "cvh.summary.v1",
        "description": "CVH summary envelope",
        "type": "object",
        "required": ["producer", "version", "cvh_score", "coverage", "summary"],
        "properties": {
            "producer": { "type": "string" },
            "version": { "type": "string" },
            "cvh_score": { "type": ["number", "null"], "minimum": 0.0, "maximum": 1.0 },
            "coverage": { "type": "integer", "minimum": 0, "maximum": 8 },
            "summary": {
                "type": "object",
                "required": ["evaluated_at"],
                "properties": {
                    "evaluated_at": { "type": "string", "format": "date-time" }
                },
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "factor": { "type": "string" },
                        "value": {},
                        "score": { "type": ["number", "null"] },
                        "time_range": { "type": ["object", "null"] }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum CvhCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoRecords,
    NoSamples,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for CvhCliError {
    fn from(e: io::Error) -> Self {
        CvhCliError::Io(e)
    }
}

impl From<EngineError> for CvhCliError {
    fn from(e: EngineError) -> Self {
        CvhCliError::Engine(e)
    }
}

impl From<serde_json::Error> for CvhCliError {
    fn from(e: serde_json::Error) -> Self {
        CvhCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CvhCliError> for CliError {
    fn from(e: CvhCliError) -> Self {
        match e {
            CvhCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CvhCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches mhc.raw_sample.v1 schema".to_string()),
            },
            CvhCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CvhCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CvhCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No quantity samples of the requested type found".to_string(),
                hint: Some("Check the --sample-type value against the input".to_string()),
            },
            CvhCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            CvhCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            CvhCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    record_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
