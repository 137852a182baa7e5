use darling::FromDeriveInput as _;
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error};

use crate::ssz_type::SszType;

mod crate_path;
mod ssz_type;

/// Derives `SszHash` for a container.
///
/// The root is computed by merkleizing the roots of all fields in declaration order.
#[proc_macro_derive(SszHash, attributes(ssz))]
pub fn derive_ssz_hash(input: TokenStream) -> TokenStream {
    let derive_input = parse_macro_input!(input as DeriveInput);

    match SszType::from_derive_input(&derive_input) {
        Ok(ssz_type) => ssz_type
            .impl_ssz_hash()
            .unwrap_or_else(Error::into_compile_error),
        Err(error) => error.write_errors(),
    }
    .into()
}
