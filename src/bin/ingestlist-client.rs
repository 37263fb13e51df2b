use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fs;
use std::io;
use std::path::PathBuf;

use ingestlist_client::blocking::{IngestListClient, WrapperClient};
use ingestlist_client::decode::{analysis, report};
use ingestlist_client::{ClientConfig, Job, JobMode, JobRequest};

fn job_command(name: &'static str) -> Command {
    Command::new(name)
        .arg(
            Arg::new("file_path")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("remote")
                .long("remote")
                .action(ArgAction::SetTrue)
                .help("the path names a file already on the server"),
        )
        .arg(
            Arg::new("no-wait")
                .long("no-wait")
                .action(ArgAction::SetTrue)
                .help("print the freshly created job instead of waiting for it"),
        )
        .arg(
            Arg::new("decode")
                .long("decode")
                .value_parser(["report", "analysis"])
                .help("decode the output of the completed job"),
        )
}

fn file_arg() -> Arg {
    Arg::new("file_path")
        .value_parser(value_parser!(PathBuf))
        .required(true)
}

fn job_id_arg() -> Arg {
    Arg::new("job_id")
        .value_parser(value_parser!(u64))
        .required(true)
}

fn print<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    Ok(serde_json::to_writer(io::stdout(), value)?)
}

fn print_job(job: &Job, decode: Option<&String>) -> Result<(), Box<dyn std::error::Error>> {
    match decode.map(String::as_str) {
        Some("report") => print(&report::parse(&job.output)?),
        Some("analysis") => print(&analysis::parse(&job.output)?),
        _ => print(job),
    }
}

fn config(matches: &ArgMatches) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config.base_url = base_url.clone();
    }
    if let Some(username) = matches.get_one::<String>("username") {
        config.username = username.clone();
    }
    if let Some(password) = matches.get_one::<String>("password") {
        config.password = password.clone();
    }
    Ok(config)
}

fn client(matches: &ArgMatches) -> Result<IngestListClient, Box<dyn std::error::Error>> {
    Ok(IngestListClient::new(&config(matches)?)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = Command::new("ingestlist-client")
        .arg(Arg::new("base-url").long("base-url").required(false))
        .arg(Arg::new("username").long("username").required(false))
        .arg(Arg::new("password").long("password").required(false))
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(job_command("identify"))
        .subcommand(job_command("validate"))
        .subcommand(Command::new("status").arg(job_id_arg()))
        .subcommand(Command::new("wait").arg(job_id_arg()))
        .subcommand(
            Command::new("ilwrapper")
                .about("identify synchronously against an IL wrapper deployment")
                .arg(file_arg())
                .arg(
                    Arg::new("remote")
                        .long("remote")
                        .action(ArgAction::SetTrue)
                        .help("the path names a file already on the server"),
                ),
        )
        .subcommand(Command::new("decode-report").arg(file_arg()))
        .subcommand(Command::new("decode-analysis").arg(file_arg()))
        .get_matches();

    match matches.subcommand() {
        Some((name @ ("identify" | "validate"), sub)) => {
            let mode = if name == "identify" {
                JobMode::Identify
            } else {
                JobMode::Validate
            };
            let path = sub
                .get_one::<PathBuf>("file_path")
                .expect("file_path is required");
            let request = if sub.get_flag("remote") {
                JobRequest::remote(path.to_string_lossy(), mode)
            } else {
                JobRequest::from_file(path, mode)?
            };

            let client = client(&matches)?;
            if sub.get_flag("no-wait") {
                return print(&client.submit(&request)?);
            }
            let job = client.run(&request)?;
            print_job(&job, sub.get_one::<String>("decode"))
        }
        Some(("status", sub)) => {
            let job_id = *sub.get_one::<u64>("job_id").expect("job_id is required");
            print(&client(&matches)?.status(job_id)?)
        }
        Some(("wait", sub)) => {
            let job_id = *sub.get_one::<u64>("job_id").expect("job_id is required");
            print(&client(&matches)?.wait_for(job_id)?)
        }
        Some(("ilwrapper", sub)) => {
            let path = sub
                .get_one::<PathBuf>("file_path")
                .expect("file_path is required");
            let wrapper = WrapperClient::new(&config(&matches)?)?;
            let response = if sub.get_flag("remote") {
                wrapper.identify_path(&path.to_string_lossy())?
            } else {
                wrapper.identify_file(path)?
            };
            print(&response.report()?)
        }
        Some(("decode-report", sub)) => {
            let path = sub
                .get_one::<PathBuf>("file_path")
                .expect("file_path is required");
            print(&report::parse(&fs::read_to_string(path)?)?)
        }
        Some(("decode-analysis", sub)) => {
            let path = sub
                .get_one::<PathBuf>("file_path")
                .expect("file_path is required");
            print(&analysis::parse(&fs::read_to_string(path)?)?)
        }
        _ => unreachable!("a subcommand is required"),
    }
}
