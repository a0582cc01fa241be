use cantel_codec::decode;

use crate::cmd::{parse_hex, parse_id, DecodeArgs};
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decode, OutputFormat};

/// Decode one frame offline. Unknown ids and bad lengths are printed and
/// reported through the exit code.
pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let id = parse_id(&args.id)
        .or_else(|| cantel_codec::find(&args.id).map(|descriptor| descriptor.id))
        .ok_or_else(|| CliError::usage(format!("invalid frame id: {}", args.id)))?;
    let payload = parse_hex(&args.payload)?;

    let result = decode(id, &payload);
    print_decode(&result, format);

    Ok(if result.is_decoded() {
        SUCCESS
    } else {
        DATA_INVALID
    })
}
