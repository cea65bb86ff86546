use getopts::Options;
use log::info;
use scanjob::calibration_parser::{read_calibrations, read_layer};
use scanjob::partition::PartitionOrder;
use scanjob::pipeline::build_layer_with;
use std::env;
use std::process;

fn usage(prg: &str, opts: Options) {
    let brief = format!("Usage: {} [options] CALIBRATION LAYER", prg);
    print!("{}", opts.usage(&brief));
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();
    let mut opts = Options::new();
    opts.optopt("c", "card", "calibration to use when the file has several", "INDEX");
    opts.optflag(
        "m",
        "merge",
        "group all regions with equal sky-writing together, reordering them",
    );
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("{}", f);
            process::exit(2);
        }
    };
    if matches.opt_present("h") {
        usage(&program, opts);
        return;
    }
    if matches.free.len() < 2 {
        usage(&program, opts);
        process::exit(2);
    }

    let card = match matches.opt_str("card") {
        Some(arg) => match arg.parse::<usize>() {
            Ok(value) => value,
            Err(err) => {
                eprintln!("Invalid card index: {}", err);
                process::exit(2);
            }
        },
        None => 0,
    };
    let order = if matches.opt_present("merge") {
        PartitionOrder::MergeByFlag
    } else {
        PartitionOrder::Preserve
    };

    let calibrations = match read_calibrations(&matches.free[0]) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", matches.free[0], e);
            process::exit(1);
        }
    };
    let calib = match calibrations.get(card) {
        Some(c) => c,
        None => {
            eprintln!(
                "No calibration {} in {} ({} available)",
                card,
                matches.free[0],
                calibrations.len()
            );
            process::exit(1);
        }
    };
    let layer = match read_layer(&matches.free[1]) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}: {}", matches.free[1], e);
            process::exit(1);
        }
    };

    let jobs = match build_layer_with(&layer, calib, order) {
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    info!("{} job groups", jobs.groups.len());
    match serde_json::to_string_pretty(&jobs.groups) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to format output: {}", e);
            process::exit(1);
        }
    }
    for (index, e) in &jobs.rejected {
        eprintln!("Region {} rejected: {}", index, e);
    }
    if !jobs.is_complete() {
        process::exit(1);
    }
}
