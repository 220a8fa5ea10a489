//! Token encryption key generation.

use lucidsync_admin::crypto::TokenCipher;

/// Print a fresh base64 key suitable for `TOKEN_ENCRYPTION_KEY`.
pub fn print_key() {
    #[allow(clippy::print_stdout)]
    {
        println!("{}", TokenCipher::generate_key());
    }
}
