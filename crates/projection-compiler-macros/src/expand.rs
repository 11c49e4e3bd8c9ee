use crate::schema::{Field, FieldKind, Shape};

use proc_macro2::TokenStream;
use quote::quote;

pub(crate) fn shape(shape: &Shape) -> TokenStream {
    let ident = &shape.ident;
    let registrations = shape.fields.iter().map(registration);

    quote! {
        impl ::projection_compiler::Shape for #ident {
            fn describe(shape: &mut ::projection_compiler::ShapeBuilder<Self>) {
                #( #registrations )*
            }
        }
    }
}

fn registration(field: &Field) -> TokenStream {
    let ident = &field.ident;
    let name = &field.name;

    match (field.kind, field.optional) {
        (FieldKind::Scalar, _) => quote! {
            shape.field(#name, |value| ::core::clone::Clone::clone(&value.#ident));
        },
        (FieldKind::Items, false) => quote! {
            shape.items(#name, |value| ::core::option::Option::Some(&value.#ident[..]));
        },
        (FieldKind::Items, true) => quote! {
            shape.items(#name, |value| value.#ident.as_deref());
        },
        (FieldKind::Object, false) => quote! {
            shape.object(#name, |value| ::core::option::Option::Some(&value.#ident));
        },
        (FieldKind::Object, true) => quote! {
            shape.object(#name, |value| value.#ident.as_ref());
        },
    }
}
