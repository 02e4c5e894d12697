//! Derive macro for quarry entities.
//!
//! This crate provides `#[derive(Entity)]`, which implements
//! `quarry_orm::Entity` for a struct with named fields: the entity
//! descriptor plus the conversions to and from records.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, LitStr, Path, Type,
};

/// Derives `quarry_orm::Entity` for a struct.
///
/// The struct needs an `id: Option<i64>` field, the generated primary key.
/// Every other field becomes a property named after the field in
/// camelCase; its column type and nullability come from the Rust type.
///
/// # Container attributes
///
/// - `#[entity(name = "Table")]` - Table name (defaults to the struct name)
/// - `#[entity(unique(a, b))]` - Unique constraint over several fields
/// - `#[entity(uses = Base)]` - Inherits the fields of another entity
/// - `#[entity(log(insert, update, delete, lifetime = 30))]` - Entity-log
///   triggers
///
/// # Field attributes
///
/// - `#[entity(rename = "name")]` - Property name
/// - `#[entity(max_length = 64)]`, `big`, `unsigned`, `json`, `unique`
/// - `#[entity(nullable)]`, `#[entity(required)]` - Override nullability
/// - `#[entity(values("a", "b"))]` - Enum column
/// - `#[entity(extending(active = "Active"))]` - Enum with labels
/// - `#[entity(default = 3)]`, `default_now`, `default_with = path::to::fn`
/// - `#[entity(hidden)]`, `#[entity(visible_to("admin"))]` - Visibility
/// - `#[entity(many = Target)]` - Many-to-many relation on a `RelationHandle`
/// - `#[entity(through(owner, target))]` - Relation managed by `Target`
/// - `#[entity(transient)]` - Not persisted; `Default` on hydration
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_entity_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_entity_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let container = parse_container_attrs(&input.attrs)?;
    let table_name = container
        .name
        .clone()
        .unwrap_or_else(|| struct_name.to_string());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity derive only supports structs",
            ));
        }
    };

    let mut has_id = false;
    let mut properties: Vec<PropertyInfo> = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        if ident == "id" {
            if !is_option_i64(&field.ty) {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "the `id` field of an entity must be `Option<i64>`",
                ));
            }
            has_id = true;
            continue;
        }
        let attrs = parse_field_attrs(&field.attrs)?;
        let property = attrs
            .rename
            .clone()
            .unwrap_or_else(|| to_camel_case(&ident.to_string()));
        properties.push(PropertyInfo {
            ident,
            ty: field.ty.clone(),
            property,
            attrs,
        });
    }
    if !has_id {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "an entity needs an `id: Option<i64>` field",
        ));
    }

    let field_builders: Vec<TokenStream2> = properties
        .iter()
        .map(field_builder)
        .collect::<syn::Result<_>>()?;

    let unique_constraints: Vec<TokenStream2> = container
        .unique
        .iter()
        .map(|idents| {
            let names = idents
                .iter()
                .map(|ident| {
                    properties
                        .iter()
                        .find(|p| p.ident == *ident)
                        .map(|p| p.property.clone())
                        .ok_or_else(|| syn::Error::new_spanned(ident, "unknown field in unique()"))
                })
                .collect::<syn::Result<Vec<_>>>()?;
            Ok(quote! { .unique([#(#names),*]) })
        })
        .collect::<syn::Result<_>>()?;

    let uses = container.uses.as_ref().map(|base| {
        quote! { .uses_properties_of::<#base>() }
    });

    let entity_log = container.log.as_ref().map(|log| {
        let LogAttrs {
            insert,
            update,
            delete,
            lifetime,
        } = log;
        let lifetime = match lifetime {
            Some(days) => quote! { ::core::option::Option::Some(#days) },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            .entity_log(::quarry_orm::EntityLogConfig {
                insert: #insert,
                update: #update,
                delete: #delete,
                lifetime: #lifetime,
            })
        }
    });

    let persisted: Vec<&PropertyInfo> = properties.iter().filter(|p| !p.attrs.transient).collect();
    let to_record_fields: Vec<TokenStream2> = persisted
        .iter()
        .map(|p| {
            let ident = &p.ident;
            let property = &p.property;
            quote! {
                record.set(#property, ::quarry_orm::FieldType::to_field(&self.#ident));
            }
        })
        .collect();

    let from_record_fields: Vec<TokenStream2> = properties
        .iter()
        .map(|p| {
            let ident = &p.ident;
            let ty = &p.ty;
            let property = &p.property;
            if p.attrs.transient {
                quote! { #ident: ::core::default::Default::default() }
            } else {
                quote! { #ident: record.field::<#ty>(#property)? }
            }
        })
        .collect();

    let expanded = quote! {
        impl ::quarry_orm::Entity for #struct_name {
            fn describe() -> ::quarry_orm::EntityDescriptor {
                ::quarry_orm::EntityDescriptor::new(#table_name)
                    #(.field(#field_builders))*
                    #(#unique_constraints)*
                    #uses
                    #entity_log
            }

            fn to_record(&self) -> ::quarry_orm::EntityRecord {
                let mut record = ::quarry_orm::EntityRecord::new(#table_name);
                record.set_id(self.id);
                #(#to_record_fields)*
                record
            }

            fn from_record(
                record: &::quarry_orm::EntityRecord,
            ) -> ::core::result::Result<Self, ::quarry_orm::HydrationError> {
                ::core::result::Result::Ok(Self {
                    id: record.id(),
                    #(#from_record_fields),*
                })
            }

            fn id(&self) -> ::core::option::Option<i64> {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = ::core::option::Option::Some(id);
            }
        }
    };

    Ok(expanded)
}

fn field_builder(info: &PropertyInfo) -> syn::Result<TokenStream2> {
    let property = &info.property;
    let ty = &info.ty;
    let attrs = &info.attrs;

    let mut builder = match &attrs.many {
        Some(target) => quote! { ::quarry_orm::Field::many::<#target>(#property) },
        None => quote! { ::quarry_orm::Field::typed::<#ty>(#property) },
    };
    let mut push = |modifier: TokenStream2| {
        builder = quote! { #builder.#modifier };
    };

    if let Some(length) = attrs.max_length {
        push(quote! { max_length(#length) });
    }
    for (set, modifier) in [
        (attrs.unique, quote! { unique() }),
        (attrs.big, quote! { big() }),
        (attrs.unsigned, quote! { unsigned() }),
        (attrs.json, quote! { json() }),
        (attrs.transient, quote! { transient() }),
        (attrs.hidden, quote! { hidden() }),
        (attrs.nullable, quote! { nullable() }),
        (attrs.required, quote! { required() }),
        (attrs.default_now, quote! { default_now() }),
    ] {
        if set {
            push(modifier);
        }
    }
    if let Some(values) = &attrs.values {
        push(quote! { values([#(#values),*]) });
    }
    if let Some(mappings) = &attrs.extending {
        let pairs = mappings
            .iter()
            .map(|(value, label)| quote! { (#value, #label) });
        push(quote! { extending([#(#pairs),*]) });
    }
    if let Some(groups) = &attrs.visible_to {
        push(quote! { visible_to(::std::vec::Vec::<&str>::from([#(#groups),*])) });
    }
    if let Some(default) = &attrs.default {
        push(quote! { default(#default) });
    }
    if let Some(constructor) = &attrs.default_with {
        push(quote! {
            default_with(|| ::quarry_orm::FieldType::to_field(&#constructor()))
        });
    }
    if let Some((this, other)) = &attrs.through {
        if attrs.many.is_none() {
            return Err(syn::Error::new_spanned(
                &info.ident,
                "`through` needs a `many = Target` relation",
            ));
        }
        let this = to_camel_case(&this.to_string());
        let other = to_camel_case(&other.to_string());
        push(quote! { through(#this, #other) });
    }
    Ok(builder)
}

struct PropertyInfo {
    ident: Ident,
    ty: Type,
    property: String,
    attrs: FieldAttrs,
}

#[derive(Default)]
struct LogAttrs {
    insert: bool,
    update: bool,
    delete: bool,
    lifetime: Option<u32>,
}

#[derive(Default)]
struct ContainerAttrs {
    name: Option<String>,
    unique: Vec<Vec<Ident>>,
    uses: Option<Path>,
    log: Option<LogAttrs>,
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    max_length: Option<u32>,
    unique: bool,
    big: bool,
    unsigned: bool,
    json: bool,
    transient: bool,
    hidden: bool,
    nullable: bool,
    required: bool,
    default_now: bool,
    values: Option<Vec<LitStr>>,
    extending: Option<Vec<(String, LitStr)>>,
    visible_to: Option<Vec<LitStr>>,
    default: Option<Lit>,
    default_with: Option<Path>,
    many: Option<Path>,
    through: Option<(Ident, Ident)>,
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut result = ContainerAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                result.name = Some(value.value());
            } else if meta.path.is_ident("unique") {
                let mut idents = Vec::new();
                meta.parse_nested_meta(|inner| {
                    idents.push(inner.path.require_ident()?.clone());
                    Ok(())
                })?;
                result.unique.push(idents);
            } else if meta.path.is_ident("uses") {
                result.uses = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("log") {
                let mut log = LogAttrs::default();
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("insert") {
                        log.insert = true;
                    } else if inner.path.is_ident("update") {
                        log.update = true;
                    } else if inner.path.is_ident("delete") {
                        log.delete = true;
                    } else if inner.path.is_ident("lifetime") {
                        let days: syn::LitInt = inner.value()?.parse()?;
                        log.lifetime = Some(days.base10_parse()?);
                    } else {
                        return Err(inner.error("expected insert, update, delete or lifetime"));
                    }
                    Ok(())
                })?;
                result.log = Some(log);
            } else {
                return Err(meta.error("unsupported entity attribute"));
            }
            Ok(())
        })?;
    }
    Ok(result)
}

fn parse_string_list(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<Vec<LitStr>> {
    let content;
    syn::parenthesized!(content in meta.input);
    let values = content.parse_terminated(|input| input.parse::<LitStr>(), syn::Token![,])?;
    Ok(values.into_iter().collect())
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let flag = [
                ("unique", &mut result.unique),
                ("big", &mut result.big),
                ("unsigned", &mut result.unsigned),
                ("json", &mut result.json),
                ("transient", &mut result.transient),
                ("hidden", &mut result.hidden),
                ("nullable", &mut result.nullable),
                ("required", &mut result.required),
                ("default_now", &mut result.default_now),
            ]
            .into_iter()
            .find(|(name, _)| meta.path.is_ident(name));
            if let Some((_, set)) = flag {
                *set = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else if meta.path.is_ident("max_length") {
                let value: syn::LitInt = meta.value()?.parse()?;
                result.max_length = Some(value.base10_parse()?);
            } else if meta.path.is_ident("values") {
                result.values = Some(parse_string_list(&meta)?);
            } else if meta.path.is_ident("visible_to") {
                result.visible_to = Some(parse_string_list(&meta)?);
            } else if meta.path.is_ident("extending") {
                let mut mappings = Vec::new();
                meta.parse_nested_meta(|inner| {
                    let value = inner.path.require_ident()?.to_string();
                    let label: LitStr = inner.value()?.parse()?;
                    mappings.push((value, label));
                    Ok(())
                })?;
                result.extending = Some(mappings);
            } else if meta.path.is_ident("default") {
                let value: Expr = meta.value()?.parse()?;
                match value {
                    Expr::Lit(lit) => result.default = Some(lit.lit),
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "default expects a literal; use default_with for computed values",
                        ))
                    }
                }
            } else if meta.path.is_ident("default_with") {
                result.default_with = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("many") {
                result.many = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("through") {
                let mut idents = Vec::new();
                meta.parse_nested_meta(|inner| {
                    idents.push(inner.path.require_ident()?.clone());
                    Ok(())
                })?;
                let [this, other]: [Ident; 2] = idents
                    .try_into()
                    .map_err(|_| meta.error("through expects two fields"))?;
                result.through = Some((this, other));
            } else {
                return Err(meta.error("unsupported field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(result)
}

fn is_option_i64(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(segment) = path.path.segments.last() else {
        return false;
    };
    if segment.ident != "Option" {
        return false;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return false;
    };
    matches!(
        args.args.first(),
        Some(syn::GenericArgument::Type(Type::Path(inner))) if inner.path.is_ident("i64")
    )
}

fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = !result.is_empty();
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}
