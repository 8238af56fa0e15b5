/// Tries to read a little-endian value from the cursor, capturing the field
/// name and start offset when reading fails.
///
/// Callers need `byteorder::ReadBytesExt` and `byteorder::LittleEndian` in
/// scope.
macro_rules! try_read {
    ($cursor:expr, u8, $what:expr) => {{
        let offset = $cursor.position();
        $cursor
            .read_u8()
            .map_err(|e| $crate::err::CompactError::FailedToRead {
                what: $what,
                offset,
                source: e,
            })?
    }};

    ($cursor:expr, u16, $what:expr) => {{
        let offset = $cursor.position();
        $cursor
            .read_u16::<LittleEndian>()
            .map_err(|e| $crate::err::CompactError::FailedToRead {
                what: $what,
                offset,
                source: e,
            })?
    }};

    ($cursor:expr, u32, $what:expr) => {{
        let offset = $cursor.position();
        $cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| $crate::err::CompactError::FailedToRead {
                what: $what,
                offset,
                source: e,
            })?
    }};
}
