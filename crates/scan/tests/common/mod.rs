//! Common fixtures for scanner integration tests
#![allow(dead_code)]

use rowscan::{
    Field, FieldMut, MemoryRows, Record, TypeDescriptor, Value, ValueError, scannable_record,
};

/// Build one row from anything convertible into a `Value`
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        vec![$(rowscan::Value::from($value)),*]
    };
}

/// In-memory rows over the given columns
pub fn rows(columns: &[&str], data: Vec<Vec<Value>>) -> MemoryRows {
    MemoryRows::new(columns.iter().copied(), data)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Pair {
    pub foo: String,
    pub bar: String,
}

impl Record for Pair {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::scalar("Foo"))
            .field(Field::scalar("Bar"))
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![FieldMut::value(&mut self.foo), FieldMut::value(&mut self.bar)]
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl Record for Address {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::scalar("Street"))
            .field(Field::scalar("City"))
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::value(&mut self.street),
            FieldMut::value(&mut self.city),
        ]
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Audit {
    pub created_by: String,
    pub id: i64,
}

impl Record for Audit {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::scalar("CreatedBy"))
            .field(Field::scalar("ID"))
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::value(&mut self.created_by),
            FieldMut::value(&mut self.id),
        ]
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    pub email: Option<String>,
    /// Not mapped
    pub session: String,
}

impl Record for User {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::scalar("ID"))
            .field(Field::scalar("UserName"))
            .field(Field::scalar("Email").column("mail"))
            .field(Field::scalar("Session").skip())
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::value(&mut self.id),
            FieldMut::value(&mut self.user_name),
            FieldMut::value(&mut self.email),
            FieldMut::value(&mut self.session),
        ]
    }
}

/// Embedded audit, a nested owner, optional addresses and one hidden field
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub audit: Audit,
    pub owner: User,
    pub billing: Option<Box<Address>>,
    pub shipping: Option<Address>,
    secret: String,
}

impl Account {
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl Record for Account {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::scalar("ID"))
            .field(Field::record::<Audit>("Audit").embedded())
            .field(Field::record::<User>("Owner"))
            .field(Field::optional::<Box<Address>>("Billing"))
            .field(Field::optional::<Address>("Shipping").column("ship"))
            .field(Field::scalar("secret").private())
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::value(&mut self.id),
            FieldMut::record(&mut self.audit),
            FieldMut::record(&mut self.owner),
            FieldMut::optional(&mut self.billing),
            FieldMut::optional(&mut self.shipping),
            FieldMut::value(&mut self.secret),
        ]
    }
}

/// Two embedded addresses at the same depth
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Contact {
    pub home: Address,
    pub work: Address,
    pub audit: Audit,
}

impl Record for Contact {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::record::<Address>("Home").embedded())
            .field(Field::record::<Address>("Work").embedded())
            .field(Field::record::<Audit>("audit").embedded().column("aud").private())
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::record(&mut self.home),
            FieldMut::record(&mut self.work),
            FieldMut::record(&mut self.audit),
        ]
    }
}

/// A record referring to itself
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub parent: Option<Box<Category>>,
}

impl Record for Category {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::scalar("Name"))
            .field(Field::optional::<Box<Category>>("Parent"))
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::value(&mut self.name),
            FieldMut::optional(&mut self.parent),
        ]
    }
}

/// Filled whole from a two-element list column
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Record for Point {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::scalar("X"))
            .field(Field::scalar("Y"))
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![FieldMut::value(&mut self.x), FieldMut::value(&mut self.y)]
    }

    fn assign_whole(&mut self, value: Value) -> Result<(), ValueError> {
        match value {
            Value::List(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                for field in self.fields_mut() {
                    if let (FieldMut::Value(slot), Some(item)) = (field, items.next()) {
                        slot.assign(item)?;
                    }
                }
                Ok(())
            }
            other => Err(ValueError::Mismatch {
                target: "Point",
                found: other.type_name(),
            }),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Landmark {
    pub name: String,
    pub location: Point,
}

impl Record for Landmark {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .field(Field::scalar("Name"))
            .field(Field::record::<Point>("Location").column("loc").opaque())
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::value(&mut self.name),
            FieldMut::record(&mut self.location),
        ]
    }
}

scannable_record!(
    Pair, Address, Audit, User, Account, Contact, Category, Point, Landmark
);
