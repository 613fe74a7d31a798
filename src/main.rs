use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use simplelog::{error, info, warn, CombinedLogger, TermLogger};

use mrtdscan::helpers;
use mrtdscan::icao9303::AccessKey;
use mrtdscan::mrz_text;
use mrtdscan::pcsc_reader::PcscReader;
use mrtdscan::reader::{Checkpoint, GroupOutcome, ReadPlan, ReadResults};
use mrtdscan::scanner::{self, CancelToken};
use mrtdscan::smartcard_abstractions::InterfaceDevice;
use mrtdscan::ScannedRecord;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Name (or part of the name) of the PC/SC reader to use. Defaults to the first one.
    #[arg(short, long)]
    reader: Option<String>,

    /// Date of birth, YYMMDD (Requires DoE and Doc Number)
    #[arg(
        short = 'b',
        long = "dob",
        value_name = "YYMMDD",
        required_unless_present_any = ["card_access_number", "mrz"]
    )]
    date_of_birth: Option<String>,

    /// Date of document expiry, YYMMDD (Requires DoB and Doc Number)
    #[arg(
        short = 'e',
        long = "doe",
        value_name = "YYMMDD",
        required_unless_present_any = ["card_access_number", "mrz"]
    )]
    date_of_expiry: Option<String>,

    /// Document number (Requires DoB and DoE)
    #[arg(
        short = 'n',
        long = "num",
        required_unless_present_any = ["card_access_number", "mrz"]
    )]
    document_number: Option<String>,

    /// Printed MRZ, TD1 or TD3, one argument per line or lines joined by newlines
    #[arg(
        short = 'm',
        long = "mrz",
        num_args = 1..,
        conflicts_with_all = [
            "date_of_birth",
            "date_of_expiry",
            "document_number",
            "card_access_number"
        ]
    )]
    mrz: Option<Vec<String>>,

    /// Card Access Number (PACE-only, mutually exclusive with DoB, DoE and Doc Number)
    #[arg(
        short = 'c',
        long = "can",
        conflicts_with_all = ["date_of_birth", "date_of_expiry", "document_number"]
    )]
    card_access_number: Option<String>,

    /// Enable debug logging
    #[arg(long = "debug", conflicts_with = "trace", default_value_t = false)]
    debug: bool,

    /// Enable trace logging
    #[arg(long = "trace", conflicts_with = "debug", default_value_t = false)]
    trace: bool,

    /// Dump the raw files and the portrait into this directory
    #[arg(long, value_name = "DIR")]
    dump: Option<PathBuf>,
}

fn access_key_from_args(args: &CliArgs) -> Result<AccessKey, String> {
    if let Some(mrz_lines) = &args.mrz {
        let access = mrz_text::parse_mrz_text(&mrz_lines.join("\n"))
            .map_err(|e| format!("Invalid MRZ: {}", e))?;
        return Ok(access.access_key);
    }
    if let Some(can) = &args.card_access_number {
        return AccessKey::from_can(can).map_err(|e| format!("Invalid CAN: {}", e));
    }
    match (
        &args.document_number,
        &args.date_of_birth,
        &args.date_of_expiry,
    ) {
        (Some(document_number), Some(date_of_birth), Some(date_of_expiry)) => {
            return AccessKey::from_mrz(document_number, date_of_birth, date_of_expiry)
                .map_err(|e| format!("Invalid document details: {}", e));
        }
        _ => return Err("Document number, date of birth and expiry are required.".to_string()),
    }
}

fn dump_results(
    dump_path: &Path,
    distinguisher: &str,
    results: &ReadResults,
    record: &ScannedRecord,
) {
    for (data_group_id, outcome) in results.outcomes.iter() {
        if let GroupOutcome::Read { raw, .. } = outcome {
            let filename =
                format!("{}-{}", distinguisher, data_group_id.info().name).replace(".", "_");
            if let Err(e) = helpers::dump_bytes(dump_path, &format!("{}.bin", filename), raw) {
                warn!("Could not dump {}: {}", data_group_id, e);
            }
        }
    }
    if let Some(portrait) = &record.portrait {
        let portrait_path = dump_path.join(format!("{}-portrait.png", distinguisher));
        if let Err(e) = portrait.save(&portrait_path) {
            warn!("Could not save the portrait: {}", e);
        }
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let log_level = if args.debug {
        simplelog::LevelFilter::Debug
    } else if args.trace {
        simplelog::LevelFilter::Trace
    } else {
        simplelog::LevelFilter::Info
    };

    CombinedLogger::init(vec![TermLogger::new(
        log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )])
    .unwrap();

    let access_key = match access_key_from_args(&args) {
        Ok(access_key) => access_key,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut interface = match PcscReader::open(args.reader.as_deref()) {
        Ok(interface) => interface,
        Err(e) => {
            error!("Couldn't open a reader: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut smartcard = match interface.select() {
        Ok(smartcard) => smartcard,
        Err(e) => {
            error!("Couldn't select an eMRTD on {}: {}", interface.reader_name(), e);
            return ExitCode::FAILURE;
        }
    };

    let (record, results) = match scanner::read_document(
        &mut smartcard,
        &access_key,
        &ReadPlan::default(),
        &mut |checkpoint| match checkpoint {
            Checkpoint::ChannelEstablished => info!("<b>Channel established.</>"),
            Checkpoint::GroupDone(data_group_id) => info!("<b>{} done.</>", data_group_id),
        },
        &CancelToken::new(),
    ) {
        Ok(read) => read,
        Err(failure) => {
            error!("Read failed: {}", failure);
            return ExitCode::FAILURE;
        }
    };

    for (data_group_id, outcome) in results.outcomes.iter() {
        match outcome {
            GroupOutcome::Read { parsed, .. } => parsed.fancy_print(data_group_id.info()),
            GroupOutcome::Absent(e) => info!("<d>{} not read: {}</>", data_group_id, e),
        }
    }
    record.fancy_print();

    if let Some(dump_path) = &args.dump {
        let distinguisher = match record.document_number.is_empty() {
            true => helpers::unix_time().to_string(),
            false => record.document_number.clone(),
        };
        dump_results(dump_path, &distinguisher, &results, &record);
        info!("Dumped files to {}", dump_path.display());
    }

    return ExitCode::SUCCESS;
}
