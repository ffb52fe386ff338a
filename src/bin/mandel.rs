// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{App, Arg, ArgMatches};
use failure::format_err;
use mandelbrot::{Deadline, FractalRenderer, RenderParams};
use num::Complex;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    parse_pair(s, ',').map(|(re, im)| Complex { re, im })
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const REQUEST: &str = "request";
const JSON: &str = "json";
const TIMEOUT: &str = "timeout";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("mandel")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Escape-time Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required_unless(JSON)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; .ppm or .pnm writes a pixmap, anything else PNG"),
        )
        .arg(
            Arg::with_name(JSON)
                .long(JSON)
                .short("j")
                .help("Print {\"image\": <base64 PNG>} to stdout"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("640x480")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-2,-1")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner (re_min,im_min) of the complex plane"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1,1")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner (re_max,im_max) of the complex plane"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("100")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        10_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 10000000",
                    )
                })
                .help("Maximum number of iterations per pixel"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use in solver [default: one per CPU]"),
        )
        .arg(
            Arg::with_name(REQUEST)
                .required(false)
                .long(REQUEST)
                .takes_value(true)
                .help("JSON request body; overrides size, corners and iterations"),
        )
        .arg(
            Arg::with_name(TIMEOUT)
                .required(false)
                .long(TIMEOUT)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        0.001,
                        86_400.0,
                        "Could not parse timeout",
                        "Timeout must be between 0.001 and 86400 seconds",
                    )
                })
                .help("Stop iterating after this many seconds and keep what is done"),
        )
        .get_matches()
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, failure::Error> {
    matches
        .value_of(name)
        .ok_or_else(|| format_err!("missing --{}", name))
}

fn params(matches: &ArgMatches) -> Result<RenderParams, failure::Error> {
    if let Some(path) = matches.value_of(REQUEST) {
        let reader = BufReader::new(File::open(path)?);
        return Ok(serde_json::from_reader(reader)?);
    }

    let (width, height) = parse_pair::<usize>(value(matches, SIZE)?, 'x')
        .ok_or_else(|| format_err!("Error parsing image dimensions"))?;
    let leftlower = parse_complex(value(matches, LEFTLOWER)?)
        .ok_or_else(|| format_err!("Error parsing left lower point"))?;
    let rightupper = parse_complex(value(matches, RIGHTUPPER)?)
        .ok_or_else(|| format_err!("Error parsing right upper point"))?;
    let max_iter = usize::from_str(value(matches, ITERATIONS)?)?;

    Ok(RenderParams {
        width,
        height,
        max_iter,
        re_min: leftlower.re,
        re_max: rightupper.re,
        im_min: leftlower.im,
        im_max: rightupper.im,
    })
}

fn run(matches: &ArgMatches) -> Result<(), failure::Error> {
    let params = params(matches)?;
    let threads = match matches.value_of(THREADS) {
        Some(threads) => usize::from_str(threads)?,
        None => num_cpus::get(),
    };
    let renderer = FractalRenderer::with_threads(threads);

    let image = match matches.value_of(TIMEOUT) {
        Some(seconds) => {
            let budget = Duration::from_secs_f64(f64::from_str(seconds)?);
            renderer.render_interruptible(&params, &Deadline(Instant::now() + budget))?
        }
        None => renderer.render(&params)?,
    };

    if let Some(outfile) = matches.value_of(OUTPUT) {
        image.save(outfile)?;
        tracing::info!(path = outfile, "image written");
    }

    if matches.is_present(JSON) {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        serde_json::to_writer(&mut stdout, &image.to_response()?)?;
        writeln!(stdout)?;
    }
    Ok(())
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let matches = args();
    if let Err(e) = run(&matches) {
        let chain: Vec<String> = e.iter_chain().map(|cause| cause.to_string()).collect();
        eprintln!("error: {}", chain.join(": "));
        std::process::exit(1);
    }
}
