use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "tpf-join")]
/// Joins triple patterns over paginated triple pattern fragments
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate the basic graph pattern of a SPARQL query against an RDF file served as paginated
    /// fragments
    ///
    /// The triples accepted by the join are written to stdout as N-Triples.
    Run {
        /// File holding the data to serve
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        data: PathBuf,
        /// The format of the data file
        ///
        /// It can be an extension like "nt" or a MIME type like "application/n-triples".
        ///
        /// By default the format is guessed from the data file extension.
        #[arg(long)]
        format: Option<String>,
        /// The SPARQL SELECT or ASK query whose basic graph pattern is evaluated
        #[arg(short, long, required_unless_present = "query_file", conflicts_with = "query_file")]
        query: Option<String>,
        /// File holding the SPARQL query
        #[arg(long, value_hint = ValueHint::FilePath)]
        query_file: Option<PathBuf>,
        /// Number of triples per fragment page
        #[arg(long, default_value_t = 100)]
        page_size: usize,
        /// The scheduling strategy
        #[arg(long, value_enum, default_value_t = Strategy::Greedy)]
        strategy: Strategy,
        /// Stop after this many rounds
        ///
        /// The broadcast strategy stops after 1000 rounds if no limit is given.
        #[arg(long)]
        max_rounds: Option<usize>,
        /// Do not filter patterns by the complete domains of their variables
        #[arg(long)]
        no_bound_filters: bool,
        /// Print the final bindings and complete domains of every variable to stderr
        #[arg(long)]
        bindings: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Read the cheapest pattern in every round and settle all variables
    Greedy,
    /// Read every pattern that is due in the same round (experimental)
    Broadcast,
}
