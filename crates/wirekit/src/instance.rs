//! Type-erased service instances and constructor arguments

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::TypeDescriptor;
use crate::error::{DIError, DIResult};

/// A built service, shared behind an `Arc`.
///
/// The payload is always an `Arc<T>` for some `T`, which may be unsized
/// (`Arc<dyn Trait>`). Cloning an instance clones the outer handle only, so
/// clones compare equal under [`Instance::ptr_eq`].
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn from_value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    /// Collection produced by a sequence request
    pub fn sequence(items: Vec<Instance>) -> Self {
        Self::new(Arc::new(items))
    }

    /// Shared handle to the payload if it is an `Arc<T>`
    pub fn get<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.value.is::<Arc<T>>()
    }

    /// Elements of a sequence instance
    pub fn items(&self) -> Option<Arc<Vec<Instance>>> {
        self.get::<Vec<Instance>>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Same underlying object
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.value, &other.value)
    }

    pub(crate) fn downcast<T: ?Sized + 'static>(&self) -> DIResult<Arc<T>> {
        self.get::<T>().ok_or_else(|| DIError::InvalidServiceType {
            message: format!(
                "expected {}, found {}",
                std::any::type_name::<T>(),
                self.type_name
            ),
        })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Resolved constructor arguments, in parameter order
pub struct Arguments {
    owner: TypeDescriptor,
    values: Vec<Instance>,
}

impl Arguments {
    pub fn new(owner: TypeDescriptor, values: Vec<Instance>) -> Self {
        Self { owner, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn instance(&self, index: usize) -> DIResult<&Instance> {
        self.values.get(index).ok_or_else(|| {
            DIError::construction(
                &self.owner,
                format!(
                    "argument {} requested but only {} supplied",
                    index,
                    self.values.len()
                ),
            )
        })
    }

    /// Argument `index` as `Arc<T>`
    pub fn get<T: ?Sized + 'static>(&self, index: usize) -> DIResult<Arc<T>> {
        let instance = self.instance(index)?;
        instance.get::<T>().ok_or_else(|| {
            DIError::construction(
                &self.owner,
                format!(
                    "argument {} is {}, not {}",
                    index,
                    instance.type_name(),
                    std::any::type_name::<T>()
                ),
            )
        })
    }

    /// Argument `index`, a sequence, with every element as `Arc<T>`
    pub fn all<T: ?Sized + 'static>(&self, index: usize) -> DIResult<Vec<Arc<T>>> {
        let items = self.get::<Vec<Instance>>(index)?;
        items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                item.get::<T>().ok_or_else(|| {
                    DIError::construction(
                        &self.owner,
                        format!(
                            "element {} of argument {} is {}, not {}",
                            position,
                            index,
                            item.type_name(),
                            std::any::type_name::<T>()
                        ),
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn test_get_concrete_and_trait_object() {
        let concrete = Instance::from_value(English);
        assert!(concrete.is::<English>());
        assert!(concrete.get::<dyn Greeter>().is_none());

        let erased = Instance::new(Arc::new(English) as Arc<dyn Greeter>);
        assert_eq!(erased.get::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(erased.get::<English>().is_none());
    }

    #[test]
    fn test_clones_share_identity() {
        let first = Instance::from_value(42u32);
        let second = first.clone();
        let other = Instance::from_value(42u32);
        assert!(Instance::ptr_eq(&first, &second));
        assert!(!Instance::ptr_eq(&first, &other));
        assert!(Arc::ptr_eq(
            &first.get::<u32>().unwrap(),
            &second.get::<u32>().unwrap()
        ));
    }

    #[test]
    fn test_sequence_items() {
        let items = vec![Instance::from_value(1u8), Instance::from_value(2u8)];
        let sequence = Instance::sequence(items);
        let values: Vec<u8> = sequence
            .items()
            .unwrap()
            .iter()
            .map(|item| *item.get::<u8>().unwrap())
            .collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_arguments_errors() {
        let arguments = Arguments::new(
            TypeDescriptor::named("Email"),
            vec![Instance::from_value(String::from("rep"))],
        );
        assert_eq!(arguments.len(), 1);
        assert_eq!(*arguments.get::<String>(0).unwrap(), "rep");
        assert!(matches!(
            arguments.get::<u32>(0),
            Err(DIError::Construction { .. })
        ));
        assert!(matches!(
            arguments.instance(3),
            Err(DIError::Construction { .. })
        ));
    }

    #[test]
    fn test_arguments_all() {
        let sequence = Instance::sequence(vec![
            Instance::from_value(English),
            Instance::from_value(English),
        ]);
        let arguments = Arguments::new(TypeDescriptor::named("Hub"), vec![sequence]);
        assert_eq!(arguments.all::<English>(0).unwrap().len(), 2);
        assert!(arguments.all::<String>(0).is_err());
    }
}
