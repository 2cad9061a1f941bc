//! Attribute parsing for the SheetRecord derive macro.
//!
//! Field attributes:
//! - `#[sheet(column = 0, header = "ID")]` : annotation-mode column
//! - `#[sheet(base)]`                      : embedded base record
//! - `#[sheet(skip)]`                      : not a record field

use proc_macro2::Span;
use syn::{
    Attribute, Error, Expr, ExprLit, Lit, Meta, Result, Token,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
};

/// Field-level attributes from `#[sheet(...)]`.
#[derive(Debug, Clone)]
pub struct SheetAttr {
    /// Target column index.
    pub column: Option<usize>,
    /// Header text.
    pub header: Option<String>,
    /// Field embeds the base record.
    pub base: bool,
    /// Field is invisible to the exporter.
    pub skip: bool,
    /// The span for error reporting.
    pub span: Span,
}

impl Default for SheetAttr {
    fn default() -> Self {
        SheetAttr {
            column: None,
            header: None,
            base: false,
            skip: false,
            span: Span::call_site(),
        }
    }
}

impl Parse for SheetAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = SheetAttr {
            span: input.span(),
            ..SheetAttr::default()
        };

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("base") => attr.base = true,
                Meta::Path(p) if p.is_ident("skip") => attr.skip = true,
                Meta::NameValue(nv) if nv.path.is_ident("column") => {
                    let Expr::Lit(ExprLit {
                        lit: Lit::Int(n), ..
                    }) = &nv.value
                    else {
                        return Err(Error::new(
                            nv.value.span(),
                            "column must be a non-negative integer literal",
                        ));
                    };
                    attr.column = Some(n.base10_parse::<usize>()?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("header") => {
                    let Expr::Lit(ExprLit {
                        lit: Lit::Str(s), ..
                    }) = &nv.value
                    else {
                        return Err(Error::new(nv.value.span(), "header must be a string literal"));
                    };
                    attr.header = Some(s.value());
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown sheet attribute. Expected: column = N, header = \"...\", base, or skip",
                    ));
                }
            }
        }

        attr.validate()?;
        Ok(attr)
    }
}

impl SheetAttr {
    fn validate(&self) -> Result<()> {
        if self.column.is_some() != self.header.is_some() {
            return Err(Error::new(
                self.span,
                "`column` and `header` must be given together",
            ));
        }
        if self.base && (self.skip || self.column.is_some()) {
            return Err(Error::new(
                self.span,
                "`base` cannot be combined with `skip` or a column",
            ));
        }
        if self.skip && self.column.is_some() {
            return Err(Error::new(self.span, "`skip` cannot be combined with a column"));
        }
        Ok(())
    }
}

/// Extract `#[sheet(...)]` attributes from a field's attributes.
pub fn parse_sheet_attrs(attrs: &[Attribute]) -> Result<SheetAttr> {
    for attr in attrs {
        if attr.path().is_ident("sheet") {
            return attr.parse_args::<SheetAttr>();
        }
    }
    Ok(SheetAttr::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_sheet(tokens: &str) -> Result<SheetAttr> {
        syn::parse_str::<SheetAttr>(tokens)
    }

    #[test]
    fn test_sheet_column_and_header() {
        let attr = parse_sheet(r#"column = 2, header = "Name""#).unwrap();
        assert_eq!(attr.column, Some(2));
        assert_eq!(attr.header.as_deref(), Some("Name"));
        assert!(!attr.base);
        assert!(!attr.skip);
    }

    #[test]
    fn test_sheet_base() {
        let attr = parse_sheet("base").unwrap();
        assert!(attr.base);
        assert_eq!(attr.column, None);
    }

    #[test]
    fn test_sheet_skip() {
        assert!(parse_sheet("skip").unwrap().skip);
    }

    #[test]
    fn test_sheet_column_without_header_fails() {
        assert!(parse_sheet("column = 1").is_err());
        assert!(parse_sheet(r#"header = "A""#).is_err());
    }

    #[test]
    fn test_sheet_negative_column_fails() {
        assert!(parse_sheet(r#"column = -1, header = "A""#).is_err());
    }

    #[test]
    fn test_sheet_header_must_be_string() {
        assert!(parse_sheet("column = 1, header = 3").is_err());
    }

    #[test]
    fn test_sheet_base_with_column_fails() {
        assert!(parse_sheet(r#"base, column = 0, header = "A""#).is_err());
    }

    #[test]
    fn test_sheet_unknown_key_fails() {
        assert!(parse_sheet("rename = \"x\"").is_err());
        assert!(parse_sheet("flatten").is_err());
    }

    #[test]
    fn test_parse_sheet_attrs_defaults_when_absent() {
        let attrs: Vec<Attribute> = vec![syn::parse_quote!(#[serde(rename = "x")])];
        let attr = parse_sheet_attrs(&attrs).unwrap();
        assert!(attr.column.is_none());
        assert!(!attr.skip);
    }
}
