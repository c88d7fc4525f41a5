use std::sync::Arc;

use crate::key::TypeKey;
use crate::provider::{ErasedBean, Instance};

type Cast = Box<dyn Fn(Instance) -> ErasedBean + Send + Sync>;

/// One type a bean can be looked up by, together with the cast from the
/// bean's erased instance to that type.
pub struct View {
    key: TypeKey,
    cast: Cast,
}

impl View {
    /// Creates a view of a `T` bean as `R`, where `cast` is usually just an
    /// unsizing coercion such as `|bean| -> Arc<dyn Role> { bean }`.
    pub fn of<T, R>(cast: fn(Arc<T>) -> Arc<R>) -> Self
    where
        T: Send + Sync + 'static,
        R: ?Sized + Send + Sync + 'static,
    {
        Self {
            key: TypeKey::of::<R>(),
            cast: Box::new(move |instance: Instance| -> ErasedBean {
                match instance.downcast::<T>() {
                    Ok(bean) => Box::new(cast(bean)),
                    Err(_) => unreachable!("the instance's type should be `T`"),
                }
            }),
        }
    }

    pub fn identity<T>() -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::of::<T, T>(|bean| bean)
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn apply(&self, instance: Instance) -> ErasedBean {
        (self.cast)(instance)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("View").field(&self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn area(&self) -> u32;
    }

    struct Square(u32);

    impl Shape for Square {
        fn area(&self) -> u32 {
            self.0 * self.0
        }
    }

    #[test]
    fn view_casts_instance_to_role() {
        let view = View::of::<Square, dyn Shape>(|bean| -> Arc<dyn Shape> { bean });
        assert_eq!(view.key(), TypeKey::of::<dyn Shape>());

        let erased = view.apply(Arc::new(Square(3)));
        let shape = erased.downcast::<Arc<dyn Shape>>().unwrap();
        assert_eq!(shape.area(), 9);
    }

    #[test]
    fn view_identity_keeps_the_same_allocation() {
        let square = Arc::new(Square(2));
        let view = View::identity::<Square>();

        let erased = view.apply(Arc::clone(&square) as Instance);
        let same = erased.downcast::<Arc<Square>>().unwrap();
        assert!(Arc::ptr_eq(&square, &same));
    }
}
