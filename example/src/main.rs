// example/src/main.rs

mod records;

use safepack::*;

use records::{Header, ProtocolMessage};

fn main() -> Result<(), PackError> {
    let header = Header {
        version: 1,
        length: 1024,
        status: -1,
    };

    // Header is laid out in network order as `!BHb`.
    let layout = Header::layout()?;
    println!("{} = {} ({} bytes)", layout.name(), layout.format_token(), layout.total_size());

    let bytes = header.pack()?;
    println!("packed header: {:02x?}", bytes);
    println!("unpacked header: {:?}", Header::unpack(&bytes)?);

    let message = ProtocolMessage {
        header: header.clone(),
        payload_id: 0xC0FFEE,
        body: *b"ping",
    };
    let layout = ProtocolMessage::layout()?;
    for info in layout.field_infos() {
        println!(
            "  {:<10} {:<8} offset={} length={}",
            info.name, info.wire_kind, info.byte_offset, info.byte_length
        );
    }

    // Pack two messages back to back into one shared buffer.
    let size = layout.total_size();
    let mut buffer = vec![0u8; size * 2];
    message.pack_into(&mut buffer, 0)?;
    ProtocolMessage {
        payload_id: 7,
        ..message.clone()
    }
    .pack_into(&mut buffer, size)?;

    let second = ProtocolMessage::unpack_from(&buffer, size)?;
    println!("second message: {:?}", second);

    // A status below -1 is rejected before anything is written.
    let invalid = Header {
        status: -3,
        ..header
    };
    match invalid.pack() {
        Err(err) => println!("rejected: {}", err),
        Ok(bytes) => println!("unexpectedly packed {:02x?}", bytes),
    }

    // A truncated buffer is reported with the expected size.
    if let Err(err) = Header::unpack(&bytes[..3]) {
        println!("rejected: {}", err);
    }

    Ok(())
}
