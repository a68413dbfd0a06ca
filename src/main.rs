// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::Level;

use merit_scholarship::{
    export, generate_sample, init_tracing, load_students, render_text, run, summarize,
    write_students, write_template, ReportScope, ResultsSummary, RunConfig, RunReport,
};

#[derive(Parser)]
#[command(name = "merit-scholarship")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rank students, allocate the scholarship budget, assign awards", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run filter → rank → allocate → assign and export the results
    Run {
        /// Student CSV in the registrar layout
        #[arg(short, long)]
        students: PathBuf,

        /// Run configuration (JSON); defaults apply when omitted
        #[arg(short, long, env = "SCHOLARSHIP_CONFIG")]
        config: Option<PathBuf>,

        /// Directory for CSV exports
        #[arg(short, long, default_value = "scholarship-results")]
        out: PathBuf,

        /// Print the full run report as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Text report scope: institution, college:NAME, tier:NAME or department:COLLEGE/DEPT
        #[arg(long, default_value = "institution")]
        scope: ReportScope,

        /// Leave the recipient list out of the text report
        #[arg(long)]
        no_roster: bool,
    },

    /// Write a CSV template with the expected columns
    Template {
        /// Output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default run configuration as JSON
    Config,

    /// Write a seeded synthetic student CSV for dry runs
    Sample {
        /// Output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Same seed, same cohort
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of students
        #[arg(short = 'n', long, default_value_t = 150)]
        count: usize,
    },

    /// Run the pipeline and browse the results interactively
    View {
        #[arg(short, long)]
        students: PathBuf,

        #[arg(short, long, env = "SCHOLARSHIP_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    init_tracing(cli.log_json, level);

    match cli.command {
        Commands::Run {
            students,
            config,
            out,
            json,
            scope,
            no_roster,
        } => run_pipeline(&students, config.as_deref(), &out, json, &scope, !no_roster),
        Commands::Template { output } => run_template(output.as_deref()),
        Commands::Sample {
            output,
            seed,
            count,
        } => run_sample(output.as_deref(), seed, count),
        Commands::Config => {
            println!("{}", RunConfig::default().to_json_pretty()?);
            Ok(())
        }
        Commands::View { students, config } => run_ui_mode(&students, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_file(path),
        None => Ok(RunConfig::default()),
    }
}

fn execute(students: &Path, config: Option<&Path>) -> Result<RunReport> {
    let config = load_config(config)?;
    let records = load_students(students)?;
    let report = run(records, config).context("Scholarship run failed")?;
    Ok(report)
}

fn run_pipeline(
    students: &Path,
    config: Option<&Path>,
    out: &Path,
    json: bool,
    scope: &ReportScope,
    include_individual: bool,
) -> Result<()> {
    if json {
        let report = execute(students, config)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("🎓 Merit Scholarship Run");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading students and configuration...");
    let report = execute(students, config)?;
    println!("✓ Run {} ({})", report.run_id, &report.fingerprint[..12]);

    println!("\n✅ Eligibility");
    println!("✓ Eligible: {}", report.partition.eligible.len());
    println!("✓ Ineligible: {}", report.partition.ineligible.len());

    println!("\n📊 Ranking");
    println!(
        "✓ {} students ranked in {} department-grade groups",
        report.ranking.total_ranked(),
        report.ranking.group_count()
    );

    println!("\n💰 Allocation");
    for college in &report.allocation.colleges {
        println!(
            "  {:<20} {:>5} enrolled  {:>6.1}%  {:>15.0}  quota {}",
            college.college,
            college.enrollment_count,
            college.budget_share * 100.0,
            college.allocated_budget,
            college.total_quota()
        );
    }
    for total in report.allocation.tier_totals() {
        println!("✓ {} quota: {}", total.tier, total.quota);
    }

    println!("\n🏆 Assignment");
    let summary = summary_of(&report);
    for tier in &summary.tiers {
        println!("✓ {}: {} students, {} total", tier.tier, tier.count, tier.total_amount);
    }
    println!("✓ Recipients: {}", summary.recipients);
    println!("✓ Total awarded: {}", summary.total_amount);

    if !summary.top_performers.is_empty() {
        println!("\n🥇 Top performers");
        for r in &summary.top_performers {
            println!(
                "  {:<10} {:<10} {:<16} {:<16} {}  {:.2}  {}",
                r.student_id, r.name, r.college, r.department, r.grade, r.gpa, r.tier
            );
        }
    }

    let show = |value: Option<f64>| value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "n/a".to_string());
    println!("\n📈 Correlations");
    println!("✓ GPA vs rank: {}", show(summary.correlations.gpa_rank));
    println!("✓ GPA vs amount: {}", show(summary.correlations.gpa_amount));
    println!("✓ Credits vs GPA: {}", show(summary.correlations.credits_gpa));

    for warning in &report.warnings {
        println!("⚠️  {}", warning);
    }

    println!("\n💾 Writing exports to {:?}...", out);
    write_exports(out, &report, scope, include_individual)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Run complete");

    Ok(())
}

fn summary_of(report: &RunReport) -> ResultsSummary {
    summarize(&report.partition.eligible, &report.assignments, &report.allocation.tiers)
}

fn write_exports(
    out: &Path,
    report: &RunReport,
    scope: &ReportScope,
    include_individual: bool,
) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("Failed to create {:?}", out))?;
    let stamp = report.generated_at.format("%Y%m%d");

    let create = |name: &str| -> Result<BufWriter<File>> {
        let path = out.join(format!("{}_{}.csv", name, stamp));
        let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        Ok(BufWriter::new(file))
    };

    export::write_partition(create("eligibility")?, &report.partition)?;
    export::write_rankings(create("ranking_results")?, &report.ranking)?;
    export::write_allocations(create("quota_results")?, &report.allocation)?;
    export::write_department_allocations(create("department_quota_results")?, &report.allocation)?;
    export::write_assignments(create("scholarship_recipients")?, &report.assignments)?;

    let summary = summary_of(report);
    let summary_path = out.join(format!("scholarship_summary_{}.json", stamp));
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("Failed to write {:?}", summary_path))?;

    let report_path = out.join(format!(
        "scholarship_report_{}.txt",
        report.generated_at.format("%Y%m%d_%H%M")
    ));
    fs::write(&report_path, render_text(&summary, scope, include_individual))
        .with_context(|| format!("Failed to write {:?}", report_path))?;

    Ok(())
}

fn run_template(output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            write_template(BufWriter::new(file))?;
            println!("✓ Template written to {:?}", path);
        }
        None => write_template(io::stdout().lock())?,
    }
    Ok(())
}

fn run_sample(output: Option<&Path>, seed: u64, count: usize) -> Result<()> {
    let records = generate_sample(seed, count);
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            write_students(BufWriter::new(file), &records)?;
            println!("✓ {} sample students written to {:?} (seed {})", records.len(), path, seed);
        }
        None => write_students(io::stdout().lock(), &records)?,
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(students: &Path, config: Option<&Path>) -> Result<()> {
    println!("🖥️  Loading scholarship results...\n");

    let report = execute(students, config)?;
    println!("✓ {} assignments ready", report.assignments.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(report);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_students: &Path, _config: Option<&Path>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin scholarship-server --features server");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("merit-scholarship-{}-{}", label, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_run_flags_parse_scope_and_roster() {
        let cli = Cli::try_parse_from([
            "merit-scholarship",
            "run",
            "--students",
            "students.csv",
            "--scope",
            "college:공과대학",
            "--no-roster",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { scope, no_roster, .. } => {
                assert_eq!(
                    scope,
                    ReportScope::College {
                        college: "공과대학".to_string()
                    }
                );
                assert!(no_roster);
            }
            _ => panic!("expected run command"),
        }

        assert!(Cli::try_parse_from(["merit-scholarship", "run", "-s", "a.csv", "--scope", "campus:x"]).is_err());
    }

    #[test]
    fn test_sample_defaults() {
        let cli = Cli::try_parse_from(["merit-scholarship", "sample"]).unwrap();
        match cli.command {
            Commands::Sample { output, seed, count } => {
                assert!(output.is_none());
                assert_eq!(seed, 42);
                assert_eq!(count, 150);
            }
            _ => panic!("expected sample command"),
        }
    }

    #[test]
    fn test_sample_feeds_a_full_run_with_text_report() {
        let dir = scratch_dir("exports");
        fs::create_dir_all(&dir).unwrap();
        let students = dir.join("students.csv");
        run_sample(Some(students.as_path()), 42, 150).unwrap();

        let report = execute(&students, None).unwrap();
        write_exports(&dir.join("out"), &report, &ReportScope::Institution, true).unwrap();

        let names: Vec<String> = fs::read_dir(dir.join("out"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        let text_name = names
            .iter()
            .find(|n| n.starts_with("scholarship_report_") && n.ends_with(".txt"))
            .unwrap();
        let text = fs::read_to_string(dir.join("out").join(text_name)).unwrap();
        assert!(text.contains("Scope: Institution"));
        assert!(text.contains("👥 Recipients"));

        let summary_name = names.iter().find(|n| n.starts_with("scholarship_summary_")).unwrap();
        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("out").join(summary_name)).unwrap()).unwrap();
        assert!(!summary["top_performers"].as_array().unwrap().is_empty());
        assert!(summary["correlations"].get("gpa_rank").is_some());

        fs::remove_dir_all(&dir).unwrap();
    }
}
