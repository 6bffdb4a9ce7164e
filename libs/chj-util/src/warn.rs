//! Printing diagnostics to stderr

use std::sync::atomic::{AtomicBool, Ordering};

/// Global switch consulted by `warn!`; on by default.
pub static DO_WARN: AtomicBool = AtomicBool::new(true);

pub fn set_warnings_enabled(on: bool) {
    DO_WARN.store(on, Ordering::SeqCst);
}

pub fn warnings_enabled() -> bool {
    DO_WARN.load(Ordering::SeqCst)
}


#[macro_export]
macro_rules! warn {
    ($formatstr:expr $(,$arg:expr)*) => { {
        if $crate::warn::warnings_enabled() {
            use std::io::Write;
            let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
            let _ = write!(&mut outp, "W: ");
            let _ = write!(&mut outp, $formatstr $(,$arg)*);
            let _ = writeln!(&mut outp, " at {:?} line {}", file!(), line!());
            let _ = outp.flush();
        }
    } }
}
