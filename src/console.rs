//! Console interface
//!
//! Standard input and output of every process are the machine console.
//! The driver behind it (UART, VGA, keyboard) is outside this crate.

/// Character console.
pub trait Console: Send + Sync {
    /// Block until a character is available and return it.
    fn getc(&self) -> u8;

    /// Write the whole buffer.
    fn putbuf(&self, buf: &[u8]);
}
