//! Filter list reception.

use protocol::{MsgReader, ProtocolError};
use tracing::trace;

use crate::session::Session;

/// Filter rules at or beyond this length terminate the session.
const MAX_RULE_LEN: i32 = 4096;

/// Whether the peer sends a filter list for this session at all.
///
/// The list arrives when we are the sender, or when the client asked for
/// prune-empty-dirs, or for delete mode at protocol 29 and newer.
pub(crate) fn expected(session: &Session) -> bool {
    let options = session.options();
    options.sender
        || options.prune_empty_dirs
        || (options.delete && session.version() >= 29)
}

/// Reads the filter list: length-prefixed rules until a zero length.
pub(crate) fn handle(
    session: &mut Session,
    reader: &mut MsgReader<'_>,
) -> Result<(), ProtocolError> {
    if !expected(session) {
        return Ok(());
    }

    loop {
        let len = reader.read_int()?;
        if len == 0 {
            break;
        }
        if len < 0 {
            return Err(ProtocolError::InvalidLength(len));
        }
        if len >= MAX_RULE_LEN {
            return Err(ProtocolError::FilterRuleTooLong(len as usize));
        }

        let rule = String::from_utf8_lossy(reader.read_data(len as usize)?).into_owned();
        trace!(rule = %rule, "received filter");
        session.push_filter(rule);
    }

    trace!(rules = session.filters().len(), "processed filters");
    Ok(())
}
