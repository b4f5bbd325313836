// 按 trait 分组的类型注册表和工厂函数

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use super::type_options::TypeOptions;

// 返回 Box<dyn Any>，实际装的是 Box<dyn Trait>
type TraitConstructor = Box<dyn Fn(JsonValue) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

// 外层 key 是 Trait 的 TypeId，内层 key 是类型名称
static TRAIT_REGISTRY: Lazy<RwLock<HashMap<TypeId, HashMap<String, TraitConstructor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// 为实现特定 Trait 的类型注册构造函数
///
/// # 示例
/// ```ignore
/// register_trait::<JsonFormatter, dyn LogFormatter, JsonFormatterConfig>("JsonFormatter")?;
///
/// let formatter: Box<dyn LogFormatter> = create_trait_from_type_options(&type_options)?;
/// ```
pub fn register_trait<T, Trait, Config>(type_name: &str) -> Result<()>
where
    T: Send + Sync + 'static,
    Trait: ?Sized + Send + Sync + 'static,
    Config: DeserializeOwned + Send + Sync + 'static,
    T: From<Config>,
    Box<T>: Into<Box<Trait>>,
{
    let constructor: TraitConstructor = Box::new(move |value| {
        let config: Config = serde_json::from_value(value)?;
        let trait_object: Box<Trait> = Box::new(T::from(config)).into();
        Ok(Box::new(trait_object) as Box<dyn Any + Send + Sync>)
    });

    let mut registry = TRAIT_REGISTRY
        .write()
        .map_err(|_| anyhow!("Failed to acquire write lock"))?;
    registry
        .entry(TypeId::of::<Trait>())
        .or_default()
        .insert(type_name.to_string(), constructor);

    Ok(())
}

/// 根据 TypeOptions 创建 trait object
pub fn create_trait_from_type_options<Trait>(type_options: &TypeOptions) -> Result<Box<Trait>>
where
    Trait: ?Sized + Send + Sync + 'static,
{
    let registry = TRAIT_REGISTRY
        .read()
        .map_err(|_| anyhow!("Failed to acquire read lock"))?;

    let constructor = registry
        .get(&TypeId::of::<Trait>())
        .ok_or_else(|| anyhow!("No implementations registered for trait"))?
        .get(&type_options.type_name)
        .ok_or_else(|| {
            anyhow!(
                "Type '{}' not registered for this trait",
                type_options.type_name
            )
        })?;

    constructor(type_options.options.clone())?
        .downcast::<Box<Trait>>()
        .map(|boxed| *boxed)
        .map_err(|_| anyhow!("Failed to downcast to target trait type"))
}

/// 生成简短的类型名称：去掉模块路径，泛型参数同样简化
///
/// `std::io::error::Error` => `Error`，`core::num::ParseIntError` => `ParseIntError`
pub fn short_type_name<T: ?Sized>() -> String {
    simplify_type_name(std::any::type_name::<T>())
}

fn simplify_type_name(full_name: &str) -> String {
    match full_name.find('<') {
        Some(generic_start) => {
            let main_part = &full_name[..generic_start];
            let main_type_name = main_part.rsplit("::").next().unwrap_or(main_part);
            format!(
                "{}{}",
                main_type_name,
                simplify_generics(&full_name[generic_start..])
            )
        }
        None => full_name
            .rsplit("::")
            .next()
            .unwrap_or(full_name)
            .to_string(),
    }
}

fn simplify_generics(generics: &str) -> String {
    let mut depth = 0;
    let mut current = String::new();
    let mut params = Vec::new();

    for ch in generics.chars() {
        match ch {
            '<' => {
                if depth > 0 {
                    current.push(ch);
                }
                depth += 1;
            }
            '>' => {
                depth -= 1;
                if depth > 0 {
                    current.push(ch);
                } else if !current.trim().is_empty() {
                    params.push(simplify_type_name(current.trim()));
                    current.clear();
                }
            }
            ',' if depth == 1 => {
                if !current.trim().is_empty() {
                    params.push(simplify_type_name(current.trim()));
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    format!("<{}>", params.join(", "))
}
