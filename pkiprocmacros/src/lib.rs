//! Procedural macros used in the definition and implementation of getters and setters for CertificationPathSettings

use quote::quote;
use syn::parse::ParseStream;
use syn::parse::{Parse, Result};
use syn::{Expr, Ident, Token};

type ValueName = Ident;
type ValueType = Ident;
type DefaultValue = Expr;

/// Signature contains the results of parsing a cps_gets_and_sets definition, i.e., the
/// name of a value stored in a CertificationPathSettings map and the corresponding type.
struct Signature {
    value_name: ValueName,
    value_type: ValueType,
}

impl Parse for Signature {
    fn parse(stream: ParseStream<'_>) -> Result<Self> {
        let value_name: ValueName = stream.parse()?;
        let _comma: Token!(,) = stream.parse()?;
        let value_type: ValueType = stream.parse()?;
        Ok(Signature {
            value_name,
            value_type,
        })
    }
}

/// SignatureWithDefault contains the results of parsing a cps_gets_and_sets_with_default definition,
/// i.e., the name of a value stored in a CertificationPathSettings map, the corresponding type and the
/// default value. For example:
///     `cps_gets_and_sets_with_default!(PS_ENFORCE_TRUST_ANCHOR_VALIDITY, bool, true);`
struct SignatureWithDefault {
    value_name: ValueName,
    value_type: ValueType,
    default_value: DefaultValue,
}

impl Parse for SignatureWithDefault {
    fn parse(stream: ParseStream<'_>) -> Result<Self> {
        let value_name: ValueName = stream.parse()?;
        let _comma: Token!(,) = stream.parse()?;
        let value_type: ValueType = stream.parse()?;
        let _comma2: Token!(,) = stream.parse()?;
        let default_value: DefaultValue = stream.parse()?;
        Ok(SignatureWithDefault {
            value_name,
            value_type,
            default_value,
        })
    }
}

/// is_string_numeric is used to determine if a string value contains only numeric characters.
/// It is used to process a slice that omits the first character, i.e., in order to identify
/// types like u8, u32, etc.
fn is_string_numeric(str: &str) -> bool {
    !str.is_empty() && str.chars().all(|c| c.is_numeric())
}

/// Names generated for one setting: getter, setter, the CertificationPathProcessingTypes variant
/// that carries the value, and doc comments for the getter and setter.
struct Accessors {
    getter: Ident,
    setter: Ident,
    cps_type: Ident,
    getter_comment: String,
    setter_comment: String,
}

/// Maps PS_SOME_VALUE to get_some_value/set_some_value and a type like u64 to the U64 variant.
fn accessors(flag: &Ident, value_type: &Ident) -> Accessors {
    let flag_str = flag.to_string();
    let trimmed = flag_str.strip_prefix("PS_").unwrap_or(&flag_str).to_lowercase();
    let getter_str = format!("get_{}", trimmed);
    let setter_str = format!("set_{}", trimmed);

    let type_str = value_type.to_string();
    let cps_type_str = if type_str == "bool" {
        "Bool".to_string()
    } else if is_string_numeric(&type_str[1..]) {
        type_str.to_uppercase()
    } else {
        type_str
    };

    Accessors {
        getter: Ident::new(&getter_str, flag.span()),
        setter: Ident::new(&setter_str, flag.span()),
        cps_type: Ident::new(&cps_type_str, value_type.span()),
        getter_comment: format!(
            "`{}` is used to retrieve `{}` items from a [`CertificationPathSettings`] instance",
            getter_str, flag
        ),
        setter_comment: format!(
            "`{}` is used to set `{}` items in a [`CertificationPathSettings`] instance",
            setter_str, flag
        ),
    }
}

/// Generates `get_x(&self) -> Option<T>` and `set_x(&mut self, v: T)` methods on
/// CertificationPathSettings for a `PS_X` key.
#[proc_macro]
pub fn cps_gets_and_sets(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    let flag = signature.value_name;
    let return_t = signature.value_type;
    let Accessors {
        getter,
        setter,
        cps_type,
        getter_comment,
        setter_comment,
    } = accessors(&flag, &return_t);

    let tokens = quote! {
        impl CertificationPathSettings {
            #[doc = #getter_comment]
            pub fn #getter(&self) -> Option<#return_t> {
                match self.0.get(#flag) {
                    Some(CertificationPathProcessingTypes::#cps_type(v)) => Some(v.clone()),
                    _ => None,
                }
            }
            #[doc = #setter_comment]
            pub fn #setter(&mut self, v: #return_t) {
                self.0.insert(
                    #flag.to_string(),
                    CertificationPathProcessingTypes::#cps_type(v),
                );
            }
        }
    };
    tokens.into()
}

/// Generates `get_x(&self) -> T` and `set_x(&mut self, v: T)` methods on
/// CertificationPathSettings for a `PS_X` key, with the getter returning the given default when
/// the key is absent or holds a value of another type.
#[proc_macro]
pub fn cps_gets_and_sets_with_default(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as SignatureWithDefault);
    let flag = signature.value_name;
    let return_t = signature.value_type;
    let default_value = signature.default_value;
    let Accessors {
        getter,
        setter,
        cps_type,
        getter_comment,
        setter_comment,
    } = accessors(&flag, &return_t);

    let tokens = quote! {
        impl CertificationPathSettings {
            #[doc = #getter_comment]
            pub fn #getter(&self) -> #return_t {
                match self.0.get(#flag) {
                    Some(CertificationPathProcessingTypes::#cps_type(v)) => v.clone(),
                    _ => #default_value,
                }
            }
            #[doc = #setter_comment]
            pub fn #setter(&mut self, v: #return_t) {
                self.0.insert(
                    #flag.to_string(),
                    CertificationPathProcessingTypes::#cps_type(v),
                );
            }
        }
    };
    tokens.into()
}
