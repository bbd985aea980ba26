//! an executable for multilevel embedding of graphs
//! example usage:
//! graphzoom --laplacian cora.mtx --features cora-feats.csv --embedder external --embed-cmd ./deepwalk.sh --embed-arg {graph} --embed-arg {embedding} simple --levels 2
//! graphzoom --laplacian cora.mtx --nofusion --embedder precomputed --embed-file coarse.csv lamg --mcr-dir /opt/matlab/R2018A/ --script ./run_coarsening.sh --reduce-ratio 2
//!
//! simple and lamg are the 2 coarsening strategies, see the coarsen module doc.
//! The refined embedding is written in csv (default) or bson format.

use anyhow::anyhow;
use clap::{arg, Arg, ArgMatches, Command};

use std::path::PathBuf;
use std::str::FromStr;

use graphzoom::prelude::*;

// parse an optional value, returning default if absent
fn parse_value<T: FromStr>(matches: &ArgMatches, name: &str, default: T) -> Result<T, anyhow::Error> {
    match matches.value_of(name) {
        Some(str) => match str.parse::<T>() {
            Ok(val) => Ok(val),
            _ => {
                log::error!("could not parse {} : {:?}", name, str);
                Err(anyhow!("error parsing {}", name))
            }
        },
        None => Ok(default),
    }
} // end of parse_value

fn parse_simple(matches: &ArgMatches, seed: u64) -> Result<CoarsenParams, anyhow::Error> {
    log::debug!("in parse_simple");
    let nb_levels = parse_value::<usize>(matches, "levels", 1)?;
    Ok(CoarsenParams::new(nb_levels, seed))
} // end of parse_simple

fn parse_lamg(matches: &ArgMatches) -> Result<LamgParams, anyhow::Error> {
    log::debug!("in parse_lamg");
    let default = LamgParams::default();
    let mcr_dir = parse_value::<PathBuf>(matches, "mcr_dir", default.mcr_dir)?;
    let reduce_ratio = parse_value::<usize>(matches, "reduce_ratio", default.reduce_ratio)?;
    let search_ratio = parse_value::<usize>(matches, "search_ratio", default.search_ratio)?;
    let output_dir = parse_value::<PathBuf>(matches, "outdir", default.output_dir)?;
    let script = matches.value_of("script").map(PathBuf::from);
    Ok(LamgParams::new(script, mcr_dir, reduce_ratio, search_ratio, output_dir))
} // end of parse_lamg

fn parse_embedder(matches: &ArgMatches) -> Result<EmbedMethod, anyhow::Error> {
    let name = matches.value_of("embedder").unwrap_or("external");
    match EmbedMethodName::from_str(name)? {
        EmbedMethodName::External => {
            let program = match matches.value_of("embed_cmd") {
                Some(cmd) => PathBuf::from(cmd),
                None => {
                    return Err(anyhow!("external embedder needs --embed-cmd"));
                }
            };
            let args: Vec<String> = match matches.values_of("embed_arg") {
                Some(values) => values.map(String::from).collect(),
                None => Vec::new(),
            };
            Ok(EmbedMethod::External { program, args })
        }
        EmbedMethodName::Precomputed => match matches.value_of("embed_file") {
            Some(path) => Ok(EmbedMethod::Precomputed { path: PathBuf::from(path) }),
            None => Err(anyhow!("precomputed embedder needs --embed-file")),
        },
    }
} // end of parse_embedder

fn parse_delimiter(matches: &ArgMatches) -> Result<u8, anyhow::Error> {
    match matches.value_of("delimiter") {
        Some(str) => {
            let bytes = str.as_bytes();
            if bytes.len() == 1 {
                Ok(bytes[0])
            } else if str == "\\t" {
                Ok(b'\t')
            } else {
                Err(anyhow!("delimiter must be a single character, got {:?}", str))
            }
        }
        None => Ok(b','),
    }
} // end of parse_delimiter

fn run(matches: &ArgMatches) -> Result<(), anyhow::Error> {
    let laplacian_path = match matches.value_of("laplacian") {
        Some(path) => PathBuf::from(path),
        None => {
            return Err(anyhow!("no laplacian file given"));
        }
    };
    let features_path = matches.value_of("features").map(PathBuf::from);
    let delim = parse_delimiter(matches)?;
    let seed = parse_value::<u64>(matches, "seed", CoarsenParams::default().get_seed())?;
    //
    let fusion_params = FusionParams::new(parse_value::<usize>(matches, "neighbours", DEFAULT_NUM_NEIGHS)?);
    let zoom_params = ZoomParams::new(
        !matches.is_present("nofusion"),
        fusion_params,
        parse_value::<f64>(matches, "lda", DEFAULT_LDA)?,
        matches.is_present("power"),
    );
    //
    let strategy = match matches.subcommand() {
        Some((name, sub_m)) => match CoarsenMode::from_str(name)? {
            CoarsenMode::Simple => {
                log::debug!("got simple coarsening");
                CoarsenStrategy::Simple(parse_simple(sub_m, seed)?)
            }
            CoarsenMode::Lamg => {
                log::debug!("got lamg coarsening");
                CoarsenStrategy::Lamg(parse_lamg(sub_m)?)
            }
        },
        None => {
            log::error!("expected subcommand simple or lamg");
            return Err(anyhow!("expected subcommand simple or lamg"));
        }
    };
    //
    let work_dir = parse_value::<PathBuf>(matches, "workdir", PathBuf::from("embed_results"))?;
    let embedder = parse_embedder(matches)?.build(&work_dir);
    //
    let format = match matches.value_of("format") {
        Some(str) => Format::from_str(str)?,
        None => Format::CSV,
    };
    let output = Output::new(format, &matches.value_of("output").map(String::from));
    //
    let mut zoom = GraphZoom::new(zoom_params, strategy, embedder);
    let (embedded, timings) = zoom.run_files(&laplacian_path, features_path.as_deref(), delim)?;
    write_embedding(&embedded, &output)?;
    println!("{}", timings);
    Ok(())
} // end of run

pub fn main() {
    //
    graphzoom::ensure_logger();
    log::info!("logger initialized");
    //
    let matches = Command::new("graphzoom")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("laplacian")
            .long("laplacian")
            .takes_value(true)
            .required(true)
            .help("laplacian of the graph in matrix market format"))
        .arg(Arg::new("features")
            .long("features")
            .takes_value(true)
            .required(false)
            .help("csv file of node features, one line per node"))
        .arg(Arg::new("delimiter")
            .long("delimiter")
            .takes_value(true)
            .required(false)
            .help("delimiter of the features file, default ,"))
        .arg(Arg::new("nofusion")
            .long("nofusion")
            .help("do not fuse the graph with the feature graph"))
        .arg(Arg::new("neighbours")
            .long("neighbours")
            .takes_value(true)
            .help("number of nearest neighbours in the feature graph, default 2"))
        .arg(Arg::new("lda")
            .long("lda")
            .takes_value(true)
            .help("self loop weight of the refinement filter, default 0.1"))
        .arg(Arg::new("power")
            .long("power")
            .help("smooth at every refinement level"))
        .arg(Arg::new("seed")
            .long("seed")
            .takes_value(true)
            .help("seed of the random generator of the spectral coarsening, default 42"))
        .arg(Arg::new("output")
            .long("output")
            .takes_value(true)
            .help("name of the refined embedding file"))
        .arg(Arg::new("format")
            .long("format")
            .takes_value(true)
            .help("csv or bson"))
        .arg(Arg::new("embedder")
            .long("embedder")
            .takes_value(true)
            .help("specify \"external\" or \"precomputed\""))
        .arg(Arg::new("embed_file")
            .long("embed-file")
            .takes_value(true)
            .help("csv embedding of the coarse graph for the precomputed embedder"))
        .arg(Arg::new("embed_cmd")
            .long("embed-cmd")
            .takes_value(true)
            .help("program run by the external embedder"))
        .arg(Arg::new("embed_arg")
            .long("embed-arg")
            .takes_value(true)
            .multiple_occurrences(true)
            .allow_hyphen_values(true)
            .help("argument of the external program, {graph} {nbnodes} {features} {embedding} are substituted"))
        .arg(Arg::new("workdir")
            .long("workdir")
            .takes_value(true)
            .help("directory of files exchanged with the external embedder"))
        .subcommand(Command::new("simple")
            .args(&[
                arg!(--levels [levels] "number of coarsening levels, default 1"),
            ])
        )
        .subcommand(Command::new("lamg")
            .arg(Arg::new("mcr_dir")
                .long("mcr-dir")
                .takes_value(true)
                .help("directory of the matlab compiler runtime"))
            .arg(Arg::new("reduce_ratio")
                .long("reduce-ratio")
                .takes_value(true)
                .help("controls the number of coarsening levels, default 2"))
            .arg(Arg::new("search_ratio")
                .long("search-ratio")
                .takes_value(true)
                .help("controls the search space of the fusion, default 12"))
            .arg(Arg::new("outdir")
                .long("outdir")
                .takes_value(true)
                .help("directory of Lamg results, default reduction_results"))
            .arg(Arg::new("script")
                .long("script")
                .takes_value(true)
                .help("script running the Lamg tool. Without it results already in outdir are used"))
        )
    .get_matches();
    //
    if let Err(e) = run(&matches) {
        log::error!("graphzoom failed : {:?}", e);
        eprintln!("graphzoom failed : {}", e);
        std::process::exit(1);
    }
} // end of main
