//! 配置相关的宏定义
//!
//! 注册表要求 `T: From<Config>` 以及 `Box<T>: Into<Box<dyn Trait>>`，这两个宏负责生成它们

/// 为配置类型自动实现 From trait
///
/// `impl_from!(ConfigType => Type)` 调用 `Type::new(config)`
#[macro_export]
macro_rules! impl_from {
    ($config_type:ty => $target_type:ty) => {
        impl From<$config_type> for $target_type {
            fn from(config: $config_type) -> Self {
                <$target_type>::new(config)
            }
        }
    };
}

/// 为 Box<T> 类型自动实现到 Box<dyn Trait> 的转换
///
/// 用法：`impl_box_from!(Type => dyn TraitName)`
#[macro_export]
macro_rules! impl_box_from {
    ($source_type:ty => dyn $trait_name:path) => {
        impl From<Box<$source_type>> for Box<dyn $trait_name> {
            fn from(source: Box<$source_type>) -> Self {
                source as Box<dyn $trait_name>
            }
        }
    };
}

#[cfg(test)]
mod tests {
    struct Padding {
        width: usize,
    }

    struct Column {
        width: usize,
    }

    impl Column {
        fn new(config: Padding) -> Self {
            Self {
                width: config.width.max(1),
            }
        }
    }

    trait Width {
        fn width(&self) -> usize;
    }

    impl Width for Column {
        fn width(&self) -> usize {
            self.width
        }
    }

    impl_from!(Padding => Column);
    impl_box_from!(Column => dyn Width);

    #[test]
    fn test_impl_from_calls_new() {
        let column = Column::from(Padding { width: 0 });
        assert_eq!(column.width, 1);
    }

    #[test]
    fn test_impl_box_from() {
        let boxed: Box<dyn Width> = Box::new(Column::from(Padding { width: 30 })).into();
        assert_eq!(boxed.width(), 30);
    }
}
