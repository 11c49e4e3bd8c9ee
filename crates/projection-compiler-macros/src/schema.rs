use heck::{ToKebabCase, ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};

#[derive(Debug)]
pub(crate) struct Shape {
    /// Struct identifier
    pub(crate) ident: syn::Ident,

    /// Registered fields, in declaration order. Skipped fields are dropped.
    pub(crate) fields: Vec<Field>,
}

#[derive(Debug)]
pub(crate) struct Field {
    pub(crate) ident: syn::Ident,

    /// Name mappings use to refer to the field
    pub(crate) name: String,

    pub(crate) kind: FieldKind,

    /// True if the field's type is `Option<...>`
    pub(crate) optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Scalar,
    /// `#[shape(items)]`: a `Vec` (or slice-like) of child shapes
    Items,
    /// `#[shape(object)]`: a nested shape
    Object,
}

#[derive(Debug, Clone, Copy)]
enum RenameRule {
    Pascal,
    LowerCamel,
    Snake,
    ScreamingSnake,
    Kebab,
    Lower,
    Upper,
}

impl RenameRule {
    fn from_lit(lit: &syn::LitStr) -> syn::Result<Self> {
        Ok(match lit.value().as_str() {
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::LowerCamel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            _ => {
                return Err(syn::Error::new_spanned(
                    lit,
                    "unknown rename rule; expected one of PascalCase, camelCase, snake_case, \
                     SCREAMING_SNAKE_CASE, kebab-case, lowercase, UPPERCASE",
                ))
            }
        })
    }

    fn apply(self, name: &str) -> String {
        match self {
            Self::Pascal => name.to_pascal_case(),
            Self::LowerCamel => name.to_lower_camel_case(),
            Self::Snake => name.to_snake_case(),
            Self::ScreamingSnake => name.to_shouty_snake_case(),
            Self::Kebab => name.to_kebab_case(),
            Self::Lower => name.to_lowercase(),
            Self::Upper => name.to_uppercase(),
        }
    }
}

impl Shape {
    pub(crate) fn from_ast(item: &syn::ItemStruct) -> syn::Result<Self> {
        if !item.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &item.generics,
                "Shape cannot be derived for generic structs",
            ));
        }

        let syn::Fields::Named(named) = &item.fields else {
            return Err(syn::Error::new_spanned(
                item,
                "Shape can only be derived for structs with named fields",
            ));
        };

        let rename_all = container_rename(&item.attrs)?;

        let mut fields = Vec::new();
        let mut errors: Option<syn::Error> = None;

        for field in &named.named {
            match Field::from_ast(field, rename_all) {
                Ok(Some(field)) => fields.push(field),
                Ok(None) => {}
                Err(err) => match &mut errors {
                    Some(acc) => acc.combine(err),
                    None => errors = Some(err),
                },
            }
        }

        if let Some(err) = errors {
            return Err(err);
        }

        Ok(Self {
            ident: item.ident.clone(),
            fields,
        })
    }
}

fn container_rename(attrs: &[syn::Attribute]) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;

    for attr in attrs {
        if !attr.path().is_ident("shape") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if rule.is_some() {
                    return Err(meta.error("duplicate `rename_all`"));
                }
                let lit: syn::LitStr = meta.value()?.parse()?;
                rule = Some(RenameRule::from_lit(&lit)?);
                Ok(())
            } else {
                Err(meta.error("unknown shape attribute; expected `rename_all`"))
            }
        })?;
    }

    Ok(rule)
}

impl Field {
    /// Returns `None` for `#[shape(skip)]` fields.
    fn from_ast(field: &syn::Field, rename_all: Option<RenameRule>) -> syn::Result<Option<Self>> {
        let Some(ident) = &field.ident else {
            return Err(syn::Error::new_spanned(field, "shape fields must be named"));
        };

        let mut rename = None;
        let mut kind = FieldKind::Scalar;
        let mut skip = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("shape") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let lit: syn::LitStr = meta.value()?.parse()?;
                    rename = Some(lit.value());
                } else if meta.path.is_ident("items") {
                    set_kind(&mut kind, FieldKind::Items, &meta)?;
                } else if meta.path.is_ident("object") {
                    set_kind(&mut kind, FieldKind::Object, &meta)?;
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else {
                    return Err(meta.error(
                        "unknown shape attribute; expected `rename`, `items`, `object` or `skip`",
                    ));
                }
                Ok(())
            })?;
        }

        if skip {
            return Ok(None);
        }

        // Raw identifiers (`r#type`) register without the prefix.
        let raw = ident.to_string();
        let base = raw.strip_prefix("r#").unwrap_or(&raw);
        let name = match (rename, rename_all) {
            (Some(name), _) => name,
            (None, Some(rule)) => rule.apply(base),
            (None, None) => base.to_string(),
        };

        Ok(Some(Self {
            ident: ident.clone(),
            name,
            kind,
            optional: is_option(&field.ty),
        }))
    }
}

fn set_kind(kind: &mut FieldKind, value: FieldKind, meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if *kind != FieldKind::Scalar {
        return Err(meta.error("a field can be `items` or `object`, not both"));
    }
    *kind = value;
    Ok(())
}

fn is_option(ty: &syn::Type) -> bool {
    let syn::Type::Path(path) = ty else {
        return false;
    };
    path.qself.is_none()
        && path.path.segments.last().is_some_and(|segment| {
            segment.ident == "Option"
                && matches!(segment.arguments, syn::PathArguments::AngleBracketed(_))
        })
}
