use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vvc::LengthSize;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "vvcc",
    version,
    about = "VVC (H.266) decoder configuration record tool",
    long_about = "Builds the VVCDecoderConfigurationRecord (vvcC) of an Annex-B VVC elementary stream,\n\
                  converts Annex-B streams to length-prefixed NAL unit streams and inspects\n\
                  existing records."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a decoder configuration record from an Annex-B file
    Record {
        /// Annex-B input, an existing record is copied unchanged
        input: PathBuf,

        /// Where the record is written
        #[arg(short, long)]
        output: PathBuf,

        /// Mark the VPS, SPS and PPS arrays as incomplete
        #[arg(long, help = "Parameter sets may also be present in the stream")]
        incomplete_arrays: bool,

        /// NAL unit length prefix size in bytes
        #[arg(long, default_value = "4", value_parser = parse_length_size)]
        length_size: LengthSize,
    },

    /// Convert an Annex-B file to a length-prefixed NAL unit stream
    LengthPrefixed {
        /// Annex-B input
        input: PathBuf,

        /// Where the stream is written
        #[arg(short, long)]
        output: PathBuf,

        /// Drop VPS, SPS and PPS NAL units
        #[arg(long)]
        filter_ps: bool,

        /// NAL unit length prefix size in bytes
        #[arg(long, default_value = "4", value_parser = parse_length_size)]
        length_size: LengthSize,
    },

    /// Print the fields of a decoder configuration record
    Inspect {
        /// Serialized record
        input: PathBuf,
    },
}

fn parse_length_size(value: &str) -> Result<LengthSize, String> {
    let bytes = value
        .parse::<u8>()
        .map_err(|err| format!("invalid length size '{value}': {err}"))?;
    LengthSize::try_from(bytes).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use vvc::LengthSize;

    use super::{CliArgs, Command};

    #[test]
    fn test_record_defaults() {
        let args = CliArgs::try_parse_from(["vvcc", "record", "in.266", "-o", "out.vvcc"]).unwrap();

        assert!(!args.verbose);
        match args.command {
            Command::Record {
                input,
                output,
                incomplete_arrays,
                length_size,
            } => {
                assert_eq!(input, PathBuf::from("in.266"));
                assert_eq!(output, PathBuf::from("out.vvcc"));
                assert!(!incomplete_arrays);
                assert_eq!(length_size, LengthSize::Four);
            }
            command => panic!("unexpected command: {command:?}"),
        }
    }

    #[test]
    fn test_length_prefixed_flags() {
        let args = CliArgs::try_parse_from([
            "vvcc",
            "length-prefixed",
            "in.266",
            "--output",
            "out.bin",
            "--filter-ps",
            "--length-size",
            "2",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Command::LengthPrefixed {
                filter_ps, length_size, ..
            } => {
                assert!(filter_ps);
                assert_eq!(length_size, LengthSize::Two);
            }
            command => panic!("unexpected command: {command:?}"),
        }
    }

    #[test]
    fn test_invalid_length_size() {
        assert!(CliArgs::try_parse_from(["vvcc", "record", "in.266", "-o", "out", "--length-size", "3"]).is_err());
        assert!(CliArgs::try_parse_from(["vvcc", "record", "in.266", "-o", "out", "--length-size", "x"]).is_err());
    }

    #[test]
    fn test_output_required() {
        assert!(CliArgs::try_parse_from(["vvcc", "record", "in.266"]).is_err());
        assert!(CliArgs::try_parse_from(["vvcc", "inspect", "in.vvcc"]).is_ok());
    }
}
