use std::thread;

use cantel_codec::{
    decode, encode, encode_faults, wire_payload, FaultFlag, FaultSet, SignalDescriptor, RAW_SIZE,
};
use cantel_transport::{FrameSink, UdpConfig, UdpTransport};
use tracing::debug;

use crate::cmd::{parse_duration, parse_id, resolve_signal, SendArgs};
use crate::exit::{encode_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let descriptor = resolve_signal(&args.signal)?;
    let every = parse_duration(&args.every)?;
    if args.repeat == 0 {
        return Err(CliError::usage("--repeat must be at least 1"));
    }

    let raw = encode_value(descriptor, &args.value)?;
    let payload = wire_payload(descriptor.id, &raw);
    let frame = decode(descriptor.id, payload).into_frame().ok_or_else(|| {
        CliError::new(
            INTERNAL,
            format!("encoded payload for 0x{:03X} did not decode", descriptor.id),
        )
    })?;

    let mut sink = UdpTransport::open(UdpConfig::sender(args.to))
        .map_err(|err| transport_error("open failed", err))?;

    for n in 0..args.repeat {
        if n > 0 {
            thread::sleep(every);
        }
        sink.send(descriptor.id, payload)
            .map_err(|err| transport_error("send failed", err))?;
        debug!(id = descriptor.id, value = %frame.formatted_value(), "frame sent");
    }

    print_sent(&frame, payload, &args.to.to_string(), args.repeat, format);
    Ok(SUCCESS)
}

fn encode_value(descriptor: &SignalDescriptor, input: &str) -> CliResult<[u8; RAW_SIZE]> {
    if descriptor.is_bitmask() {
        return Ok(encode_faults(parse_faults(input)?));
    }

    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| CliError::usage(format!("invalid value for {}: {input}", descriptor.key)))?;
    encode(descriptor.id, value).map_err(|err| encode_error("cannot encode value", err))
}

/// Accept a numeric mask (`5`, `0x05`), `none`, or comma-separated flag names.
fn parse_faults(input: &str) -> CliResult<FaultSet> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("none") || input.is_empty() {
        return Ok(FaultSet::empty());
    }

    if let Some(mask) = parse_id(input) {
        return u8::try_from(mask)
            .map(FaultSet::from_byte)
            .map_err(|_| CliError::usage(format!("fault mask must fit in one byte: {input}")));
    }

    input
        .split([',', '|'])
        .map(|name| {
            name.parse::<FaultFlag>()
                .map_err(|err| CliError::usage(err.to_string()))
        })
        .collect()
}
