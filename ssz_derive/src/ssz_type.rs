use darling::{ast::Data, util::Ignored, FromDeriveInput, FromField};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{
    punctuated::Punctuated,
    token::{Comma, Where},
    Error, Generics, Ident, Member, WhereClause, WherePredicate,
};

use crate::crate_path;

#[derive(FromDeriveInput)]
#[darling(attributes(ssz), supports(struct_named, struct_newtype, struct_tuple))]
pub struct SszType {
    ident: Ident,
    generics: Generics,
    data: Data<Ignored, SszField>,

    // Replaces the where clause of the generated impl.
    bound: Option<Punctuated<WherePredicate, Comma>>,
}

#[derive(FromField)]
pub struct SszField {
    ident: Option<Ident>,
}

impl SszType {
    pub fn impl_ssz_hash(&self) -> Result<TokenStream, Error> {
        let ssz = crate_path::crate_path("ssz")?;
        let ident = &self.ident;
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();

        let where_clause = match &self.bound {
            Some(predicates) => Some(WhereClause {
                where_token: Where::default(),
                predicates: predicates.clone(),
            }),
            None => where_clause.cloned(),
        };

        let members = self.members()?;
        let field_count = members.len();

        Ok(quote! {
            impl #impl_generics #ssz::SszHash for #ident #ty_generics #where_clause {
                type PackingFactor = #ssz::U1;

                fn hash_tree_root(&self) -> #ssz::H256 {
                    #ssz::merkleize_chunks(
                        [#(#ssz::SszHash::hash_tree_root(&self.#members),)*],
                        #field_count,
                    )
                }
            }
        })
    }

    fn members(&self) -> Result<Vec<Member>, Error> {
        let Data::Struct(fields) = &self.data else {
            return Err(Error::new(Span::call_site(), "SSZ unions are not supported"));
        };

        if fields.is_empty() {
            return Err(Error::new(
                Span::call_site(),
                "SSZ containers with no fields are illegal",
            ));
        }

        let members = fields
            .iter()
            .enumerate()
            .map(|(position, field)| {
                field
                    .ident
                    .clone()
                    .map_or_else(|| Member::Unnamed(position.into()), Member::Named)
            })
            .collect();

        Ok(members)
    }
}
