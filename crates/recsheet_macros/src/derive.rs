//! Implementation of `#[derive(SheetRecord)]`.

use proc_macro2::{Group, Ident, TokenStream, TokenTree};
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Result, Type};

use crate::attrs::parse_sheet_attrs;

struct SpecFieldEntry<'a> {
    ident: &'a Ident,
    ty: TokenStream,
    column: Option<(usize, String)>,
}

pub fn sheet_record_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "SheetRecord cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    &input,
                    "SheetRecord only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input,
                "SheetRecord can only be derived for structs",
            ));
        }
    };

    let mut l_entries: Vec<SpecFieldEntry> = Vec::new();
    let mut base_field: Option<(&Ident, TokenStream)> = None;

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attr = parse_sheet_attrs(&field.attrs)?;
        if attr.skip {
            continue;
        }
        let ty = replace_self_type(&field.ty, struct_name);
        if attr.base {
            if base_field.is_some() {
                return Err(Error::new_spanned(
                    field,
                    "only one field can be marked #[sheet(base)]",
                ));
            }
            base_field = Some((ident, ty));
            continue;
        }
        let column = attr.column.zip(attr.header);
        l_entries.push(SpecFieldEntry { ident, ty, column });
    }

    let c_struct_name = struct_name.to_string();

    let l_descriptors = l_entries.iter().map(|entry| {
        let c_field_name = entry.ident.to_string();
        let ty = &entry.ty;
        let c_type_name = ty.to_string();
        let column = match &entry.column {
            Some((n_idx, c_header)) => quote! {
                ::core::option::Option::Some(::recsheet_export::SpecColumnMeta {
                    column_index: #n_idx,
                    header: #c_header,
                })
            },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            ::recsheet_export::SpecFieldDescriptor {
                name: #c_field_name,
                type_name: #c_type_name,
                column: #column,
                nested: <#ty as ::recsheet_export::SheetField>::nested_type,
            }
        }
    });

    let l_read_arms = l_entries.iter().map(|entry| {
        let ident = entry.ident;
        let c_field_name = ident.to_string();
        quote! {
            #c_field_name => ::recsheet_export::SheetField::to_field_value(&self.#ident),
        }
    });

    let base_type = match &base_field {
        Some((_, ty)) => quote! {
            ::core::option::Option::Some(<#ty as ::recsheet_export::SheetRecord>::sheet_type)
        },
        None => quote! { ::core::option::Option::None },
    };

    let base_record = base_field.as_ref().map(|(ident, _)| {
        quote! {
            fn base_record(&self) -> ::core::option::Option<&dyn ::recsheet_export::SheetRecord> {
                ::core::option::Option::Some(&self.#ident)
            }
        }
    });

    Ok(quote! {
        impl ::recsheet_export::SheetRecord for #struct_name {
            fn sheet_type() -> &'static ::recsheet_export::SpecRecordType
            where
                Self: Sized,
            {
                static TYPE: ::recsheet_export::SpecRecordType = ::recsheet_export::SpecRecordType {
                    type_path: ::core::concat!(::core::module_path!(), "::", #c_struct_name),
                    type_name: #c_struct_name,
                    fields: &[#(#l_descriptors),*],
                    base: #base_type,
                };
                &TYPE
            }

            fn record_type(&self) -> &'static ::recsheet_export::SpecRecordType {
                <Self as ::recsheet_export::SheetRecord>::sheet_type()
            }

            fn read_field(&self, field_name: &str) -> ::recsheet_export::EnumFieldValue<'_> {
                match field_name {
                    #(#l_read_arms)*
                    _ => ::recsheet_export::EnumFieldValue::Absent,
                }
            }

            #base_record
        }

        impl ::recsheet_export::SheetField for #struct_name {
            fn to_field_value(&self) -> ::recsheet_export::EnumFieldValue<'_> {
                ::recsheet_export::EnumFieldValue::Record(self)
            }

            fn nested_type() -> ::core::option::Option<&'static ::recsheet_export::SpecRecordType>
            where
                Self: Sized,
            {
                ::core::option::Option::Some(<Self as ::recsheet_export::SheetRecord>::sheet_type())
            }
        }
    })
}

/// Field type tokens with `Self` spelled as the struct name.
///
/// The descriptor table lives in a nested `static`, where `Self` is not in
/// scope.
fn replace_self_type(ty: &Type, struct_name: &Ident) -> TokenStream {
    replace_self_tokens(quote!(#ty), struct_name)
}

fn replace_self_tokens(tokens: TokenStream, struct_name: &Ident) -> TokenStream {
    tokens
        .into_iter()
        .map(|tt| match tt {
            TokenTree::Ident(ident) if ident == "Self" => TokenTree::Ident(struct_name.clone()),
            TokenTree::Group(group) => {
                let mut replaced =
                    Group::new(group.delimiter(), replace_self_tokens(group.stream(), struct_name));
                replaced.set_span(group.span());
                TokenTree::Group(replaced)
            }
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_text(input: DeriveInput) -> Result<String> {
        sheet_record_derive_impl(input).map(|ts| ts.to_string())
    }

    #[test]
    fn test_derive_emits_descriptor_per_field() {
        let input: DeriveInput = syn::parse_quote! {
            struct Person {
                #[sheet(column = 0, header = "ID")]
                id: i64,
                #[sheet(column = 1, header = "Name")]
                name: String,
                note: Option<String>,
            }
        };
        let c_out = derive_text(input).unwrap();
        assert!(c_out.contains("\"ID\""));
        assert!(c_out.contains("\"Name\""));
        assert!(c_out.contains("\"note\""));
        assert!(!c_out.contains("fn base_record"));
    }

    #[test]
    fn test_derive_skip_and_base_fields_leave_descriptor_list() {
        let input: DeriveInput = syn::parse_quote! {
            struct Child {
                #[sheet(base)]
                parent: Parent,
                #[sheet(skip)]
                cache: std::cell::Cell<u8>,
                label: String,
            }
        };
        let c_out = derive_text(input).unwrap();
        assert!(c_out.contains("fn base_record"));
        assert!(!c_out.contains("\"cache\""));
        assert!(!c_out.contains("\"parent\""));
        assert!(c_out.contains("\"label\""));
    }

    #[test]
    fn test_derive_replaces_self_in_field_types() {
        let input: DeriveInput = syn::parse_quote! {
            struct Node {
                next: Option<Box<Self>>,
            }
        };
        let c_out = derive_text(input).unwrap();
        assert!(c_out.contains("Box < Node >"));
    }

    #[test]
    fn test_derive_rejects_two_bases() {
        let input: DeriveInput = syn::parse_quote! {
            struct Bad {
                #[sheet(base)]
                a: A,
                #[sheet(base)]
                b: B,
            }
        };
        assert!(sheet_record_derive_impl(input).is_err());
    }

    #[test]
    fn test_derive_rejects_non_struct_shapes() {
        let tuple: DeriveInput = syn::parse_quote! { struct Pair(i32, i32); };
        let en: DeriveInput = syn::parse_quote! { enum Color { Red } };
        let generic: DeriveInput = syn::parse_quote! { struct Wrap<T> { inner: T } };
        assert!(sheet_record_derive_impl(tuple).is_err());
        assert!(sheet_record_derive_impl(en).is_err());
        assert!(sheet_record_derive_impl(generic).is_err());
    }
}
