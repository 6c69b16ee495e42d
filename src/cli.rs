//! Command line front end.
//!
//! ```sh
//! gist-topics subset --topics geo,events --stats
//! gist-topics classify article.html --id 1234
//! gist-topics report records.jsonl --top 5
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::{
    app::AppContext,
    config::Config,
    logger,
    record::{articles_for_topic, low_coverage, ClassificationRecord, CoverageReport},
    subset::SchemaSubset,
    topics::Topic,
    Error, Result,
};

const DEFAULT_ENVIRONMENT: &str = "development";

#[derive(Parser)]
#[command(name = "gist-topics", version, about = "Topic classification and gist ontology subsetting")]
struct Cli {
    /// Configuration file; overrides `--environment`.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Loads `config/<environment>.yaml`.
    #[arg(short, long, global = true, default_value = DEFAULT_ENVIRONMENT)]
    environment: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the topic table
    Topics,
    /// Render the schema subset for topics or classes
    Subset {
        #[arg(long, value_delimiter = ',', conflicts_with = "classes")]
        topics: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        classes: Vec<String>,
        /// Print class and property counts instead of the schema text
        #[arg(long)]
        stats: bool,
    },
    /// Classify a document and print its record as JSON
    Classify {
        file: PathBuf,
        /// Article identifier, defaults to the file stem
        #[arg(long)]
        id: Option<String>,
    },
    /// Classify a document, then render the subset for its topics
    Pipeline {
        file: PathBuf,
        #[arg(long)]
        id: Option<String>,
    },
    /// Summarize a JSON-lines file of classification records
    Report {
        records: PathBuf,
        /// Number of topic combinations to show
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// List the best scored articles for this topic
        #[arg(long)]
        topic: Option<Topic>,
        /// List articles with at most this many topics
        #[arg(long)]
        low_coverage: Option<usize>,
    },
}

/// Parses the command line and runs the selected command.
///
/// # Errors
///
/// Returns the first failure of configuration loading or of the command.
pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None if Path::new(crate::config::DEFAULT_FOLDER).exists() => Config::new(&cli.environment)?,
        None => Config::default(),
    };
    logger::init(&config.logger);

    match cli.command {
        Commands::Report {
            records,
            top,
            topic,
            low_coverage,
        } => report(&records, top, topic, low_coverage),
        command => {
            let ctx = AppContext::create(config)?;
            run(&ctx, command).await
        }
    }
}

async fn run(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Topics => {
            for seed in ctx.table.seeds() {
                println!("{} {}", seed.topic.to_string().bold(), seed.description);
                println!("  classes: {}", seed.seed_classes.join(", "));
                if !seed.seed_properties.is_empty() {
                    println!("  properties: {}", seed.seed_properties.join(", "));
                }
            }
        }
        Commands::Subset {
            topics,
            classes,
            stats,
        } => {
            let subset = if classes.is_empty() {
                ctx.subset_by_topics(&topics)?
            } else {
                ctx.subset_by_classes(&classes)?
            };
            if stats {
                print_stats(&subset);
            } else {
                print!("{}", ctx.render(&subset));
            }
        }
        Commands::Classify { file, id } => {
            let text = fs::read_to_string(&file)?;
            let result = ctx.classify(&text).await?;
            let record = ClassificationRecord::new(article_id(id, &file), &result);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Pipeline { file, id } => {
            let text = fs::read_to_string(&file)?;
            let output = ctx.pipeline(&article_id(id, &file), &text).await?;
            println!("{}", serde_json::to_string_pretty(&output.record)?);
            println!();
            print!("{}", ctx.render(&output.subset));
        }
        Commands::Report { .. } => {
            return Err(Error::string("report does not need an application context"));
        }
    }
    Ok(())
}

fn article_id(id: Option<String>, file: &Path) -> String {
    id.unwrap_or_else(|| {
        file.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

fn print_stats(subset: &SchemaSubset) {
    let stats = subset.stats();
    let topics: Vec<&str> = subset.source_topics().iter().map(|topic| topic.as_str()).collect();
    println!("{} {}", "topics:".bold(), topics.join(", "));
    println!("{} {}", "classes:".bold(), stats.class_count);
    println!("{} {}", "object properties:".bold(), stats.object_property_count);
    println!("{} {}", "datatype properties:".bold(), stats.datatype_property_count);
}

/// Reads one JSON record per non-empty line.
fn read_records(path: &Path) -> Result<Vec<ClassificationRecord>> {
    let text = fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

fn report(path: &Path, top: usize, topic: Option<Topic>, max_topics: Option<usize>) -> Result<()> {
    let records = read_records(path)?;
    let report = CoverageReport::from_records(&records);

    println!("{} {}", "documents:".bold(), report.total);
    println!("{} {}", "without topics:".bold(), report.uncovered.to_string().yellow());
    println!();
    println!("{}", "topic distribution".bold().underline());
    for (topic, count) in &report.topic_distribution {
        let percentage = report.percentage(*topic);
        let bar = "█".repeat((percentage / 2.0).round() as usize);
        println!("  {:<15} {count:>6} ({percentage:5.1}%) {}", topic.as_str(), bar.green());
    }

    println!();
    println!("{}", "top topic combinations".bold().underline());
    for (topics, count) in report.top_combinations(top) {
        let names: Vec<&str> = topics.iter().map(|topic| topic.as_str()).collect();
        let label = if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(" + ")
        };
        println!("  {count:>6}  {label}");
    }

    if let Some(topic) = topic {
        println!();
        println!("{}", format!("articles for {topic}").bold().underline());
        for (article_id, confidence) in articles_for_topic(&records, topic, top) {
            println!("  {confidence:.2}  {article_id}");
        }
    }

    if let Some(max_topics) = max_topics {
        println!();
        println!(
            "{}",
            format!("articles with at most {max_topics} topics").bold().underline()
        );
        for record in low_coverage(&records, max_topics) {
            let names: Vec<&str> = record.topics.iter().map(|topic| topic.as_str()).collect();
            println!("  {}  [{}]", record.article_id, names.join(", "));
        }
    }
    Ok(())
}
