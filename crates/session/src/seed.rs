//! Checksum seed exchange.

use std::time::{SystemTime, UNIX_EPOCH};

use protocol::{MsgReader, MsgWriter, ProtocolError, Transport};
use tracing::trace;

use crate::session::Session;

/// Runs the seed phase: the sender picks and sends the seed, the receiver
/// reads it from the peer.
pub(crate) fn handle(
    session: &mut Session,
    reader: &mut MsgReader<'_>,
    transport: &mut dyn Transport,
) -> Result<(), ProtocolError> {
    if session.options().sender {
        let mut seed = session.options().checksum_seed;
        if seed == 0 {
            seed = wall_clock_seed();
            trace!(seed, "generated checksum seed");
        }

        let mut buf = [0u8; 4];
        let mut writer = MsgWriter::new(&mut buf);
        writer.write_int(seed)?;
        transport
            .send(session.channel(), writer.as_slice())
            .map_err(|source| ProtocolError::Io {
                context: "sending checksum seed",
                source,
            })?;
        session.set_checksum_seed(seed);
        trace!(seed, "sent checksum seed");
    } else {
        let seed = reader.read_int()?;
        session.set_checksum_seed(seed);
        trace!(seed, "read checksum seed");
    }
    Ok(())
}

fn wall_clock_seed() -> i32 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i32,
        Err(_) => 0,
    }
}
