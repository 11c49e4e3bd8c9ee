extern crate proc_macro;

mod expand;
mod schema;

use proc_macro::TokenStream;

#[proc_macro_derive(Shape, attributes(shape))]
pub fn derive_shape(input: TokenStream) -> TokenStream {
    match generate(input.into()) {
        Ok(output) => output.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn generate(input: proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream> {
    let item: syn::ItemStruct = syn::parse2(input)?;
    let shape = schema::Shape::from_ast(&item)?;

    Ok(expand::shape(&shape))
}
