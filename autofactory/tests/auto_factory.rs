//! Auto factories resolved through a real container.

use std::sync::Arc;

use autofactory::prelude::*;
use autofactory::{FactoryCallback, OverrideSet};

trait Test1: Send + Sync {
    fn property(&self) -> &str;
}

struct TestClass1 {
    property: String,
}

impl Test1 for TestClass1 {
    fn property(&self) -> &str {
        &self.property
    }
}

impl Injectable for TestClass1 {
    fn construct(r: &dyn Resolver) -> Result<Self> {
        Ok(TestClass1 {
            property: resolve(r)?,
        })
    }
}

impl_service!(TestClass1 => dyn Test1);

trait SomeInstance: Send + Sync {
    fn id(&self) -> u32;
}

struct Instance(u32);

impl SomeInstance for Instance {
    fn id(&self) -> u32 {
        self.0
    }
}

struct SomeService;

impl Injectable for SomeService {
    fn construct(_: &dyn Resolver) -> Result<Self> {
        Ok(SomeService)
    }
}

trait Test2: Send + Sync {
    fn service(&self) -> &Arc<SomeService>;
    fn property(&self) -> Option<&str>;
    fn instance(&self) -> Option<&Arc<dyn SomeInstance>>;
}

struct TestClass2 {
    service: Arc<SomeService>,
    property: Option<String>,
    instance: Option<Arc<dyn SomeInstance>>,
}

impl Test2 for TestClass2 {
    fn service(&self) -> &Arc<SomeService> {
        &self.service
    }

    fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    fn instance(&self) -> Option<&Arc<dyn SomeInstance>> {
        self.instance.as_ref()
    }
}

impl Injectable for TestClass2 {
    fn construct(r: &dyn Resolver) -> Result<Self> {
        Ok(TestClass2 {
            service: resolve(r)?,
            property: resolve(r)?,
            instance: resolve(r)?,
        })
    }
}

impl_service!(TestClass2 => dyn Test2);

type Test2Factory = Arc<dyn Factory2<Option<String>, Option<Arc<dyn SomeInstance>>, Arc<dyn Test2>>>;

fn test2_container() -> Container {
    let container = Container::new();
    container
        .register_type::<Arc<SomeService>, SomeService>(Lifetime::ContainerControlled)
        .unwrap();
    container
        .register_auto_factory_for::<Arc<dyn Test2>, TestClass2>()
        .unwrap()
        .with_params::<Option<String>, Option<Arc<dyn SomeInstance>>>()
        .unwrap();
    container
}

#[test]
fn one_string_parameter() {
    let container = Container::new();
    container
        .register_auto_factory_for::<Arc<dyn Test1>, TestClass1>()
        .unwrap()
        .with_param::<String>()
        .unwrap();

    let factory: Arc<dyn Factory1<String, Arc<dyn Test1>>> = container.resolve().unwrap();
    let result = factory.create("TestValue".to_string()).unwrap();

    assert_eq!(result.property(), "TestValue");
}

#[test]
fn two_parameters_with_injected_singleton() {
    let container = test2_container();
    let instance: Arc<dyn SomeInstance> = Arc::new(Instance(7));

    let factory: Test2Factory = container.resolve().unwrap();
    let result = factory
        .create(Some("TestValue".to_string()), Some(instance.clone()))
        .unwrap();

    let singleton: Arc<SomeService> = container.resolve().unwrap();
    assert!(Arc::ptr_eq(result.service(), &singleton));
    assert_eq!(result.property(), Some("TestValue"));
    assert!(Arc::ptr_eq(result.instance().unwrap(), &instance));
}

#[test]
fn second_argument_none() {
    let container = test2_container();
    let factory: Test2Factory = container.resolve().unwrap();

    let result = factory.create(Some("TestValue".to_string()), None).unwrap();

    assert_eq!(result.property(), Some("TestValue"));
    assert!(result.instance().is_none());
}

#[test]
fn first_argument_none() {
    let container = test2_container();
    let factory: Test2Factory = container.resolve().unwrap();

    let result = factory.create(None, Some(Arc::new(Instance(3)))).unwrap();

    assert!(result.property().is_none());
    assert_eq!(result.instance().map(|i| i.id()), Some(3));
}

#[test]
fn none_arguments_override_registered_values() {
    let container = test2_container();
    container.register_instance(Some("registered".to_string())).unwrap();
    container
        .register_instance(Some(Arc::new(Instance(1)) as Arc<dyn SomeInstance>))
        .unwrap();

    let factory: Test2Factory = container.resolve().unwrap();
    for (property, instance) in [
        (None, None),
        (Some("a".to_string()), None),
        (None, Some(Arc::new(Instance(9)) as Arc<dyn SomeInstance>)),
    ] {
        let expected_property = property.clone();
        let expected_id = instance.as_ref().map(|i| i.id());

        let result = factory.create(property, instance).unwrap();
        assert_eq!(result.property().map(str::to_owned), expected_property);
        assert_eq!(result.instance().map(|i| i.id()), expected_id);
    }
}

#[test]
fn every_create_is_a_fresh_resolution() {
    let container = test2_container();
    let factory: Test2Factory = container.resolve().unwrap();

    let a = factory.create(Some("a".into()), None).unwrap();
    let b = factory.create(Some("b".into()), None).unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(a.service(), b.service()));
    assert_eq!((a.property(), b.property()), (Some("a"), Some("b")));
}

#[derive(Clone)]
struct Witness {
    saw_overrides: bool,
    label: String,
}

impl Injectable for Witness {
    fn construct(r: &dyn Resolver) -> Result<Self> {
        Ok(Witness {
            saw_overrides: r.overrides().is_some(),
            label: resolve(r)?,
        })
    }
}

#[test]
fn without_parameters_resolves_without_an_override_set() {
    let container = Container::new();
    container.register_instance("registered".to_string()).unwrap();
    container
        .register_auto_factory_for::<Witness, Witness>()
        .unwrap()
        .without_parameters()
        .unwrap();

    let factory: Arc<dyn Factory<Witness>> = container.resolve().unwrap();
    let witness = factory.create().unwrap();

    assert!(!witness.saw_overrides);
    assert_eq!(witness.label, "registered");
}

#[test]
fn with_param_resolves_with_an_override_set() {
    let container = Container::new();
    container
        .register_auto_factory_for::<Witness, Witness>()
        .unwrap()
        .with_param::<String>()
        .unwrap();

    let factory: Arc<dyn Factory1<String, Witness>> = container.resolve().unwrap();
    let witness = factory.create("given".into()).unwrap();

    assert!(witness.saw_overrides);
    assert_eq!(witness.label, "given");
}

#[derive(Clone)]
struct Person {
    first: String,
    last: String,
    age: u32,
}

impl Injectable for Person {
    fn construct(r: &dyn Resolver) -> Result<Self> {
        Ok(Person {
            first: resolve(r)?,
            last: resolve(r)?,
            age: resolve(r)?,
        })
    }
}

#[test]
fn parameter_list_with_repeated_type() {
    let container = Container::new();
    container
        .register_auto_factory_for::<Person, Person>()
        .unwrap()
        .with_parameter_list::<(String, String, u32)>()
        .unwrap();

    let factory: Arc<dyn FactoryN<(String, String, u32), Person>> = container.resolve().unwrap();
    let person = factory
        .create(("Ada".to_string(), "Lovelace".to_string(), 36))
        .unwrap();

    assert_eq!(person.first, "Ada");
    assert_eq!(person.last, "Lovelace");
    assert_eq!(person.age, 36);
}

#[test]
fn unresolvable_parameter_surfaces_from_create() {
    let container = Container::new();
    container
        .register_auto_factory_for::<Person, Person>()
        .unwrap()
        .with_param::<u32>()
        .unwrap();

    let factory: Arc<dyn Factory1<u32, Person>> = container.resolve().unwrap();
    match factory.create(36) {
        Err(AutoFactoryError::NotRegistered(e)) => {
            assert!(e.requested.is::<String>());
            assert!(e.required_by.is_some_and(|k| k.is::<Person>()));
        }
        Err(other) => panic!("Expected NotRegistered, got: {other:?}"),
        Ok(_) => panic!("Expected NotRegistered"),
    }
}

#[test]
fn duplicate_signature_registration_fails() {
    let container = Container::new();
    container
        .register_auto_factory_for::<Arc<dyn Test1>, TestClass1>()
        .unwrap()
        .with_param::<String>()
        .unwrap();

    let err = container
        .register_auto_factory_for::<Arc<dyn Test1>, TestClass1>()
        .unwrap()
        .with_param::<String>()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Registration);
}

#[test]
fn source_registered_elsewhere_fails_immediately() {
    let container = Container::new();
    container
        .register_instance(Arc::new(TestClass1 { property: "preset".into() }) as Arc<dyn Test1>)
        .unwrap();

    let err = container
        .register_auto_factory_for::<Arc<dyn Test1>, TestClass1>()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Registration);
}

#[test]
fn second_signature_for_the_same_source() {
    let container = Container::new();
    container.register_instance("registered".to_string()).unwrap();
    container
        .register_auto_factory_for::<Arc<dyn Test1>, TestClass1>()
        .unwrap()
        .with_param::<String>()
        .unwrap();
    container
        .register_auto_factory_for::<Arc<dyn Test1>, TestClass1>()
        .unwrap()
        .without_parameters()
        .unwrap();

    let with_value: Arc<dyn Factory1<String, Arc<dyn Test1>>> = container.resolve().unwrap();
    let plain: Arc<dyn Factory<Arc<dyn Test1>>> = container.resolve().unwrap();

    assert_eq!(with_value.create("given".into()).unwrap().property(), "given");
    assert_eq!(plain.create().unwrap().property(), "registered");
}

#[test]
fn allow_override_replaces_factories() {
    let container = Container::builder().allow_override(true).build();
    for _ in 0..2 {
        container
            .register_auto_factory_for::<Arc<dyn Test1>, TestClass1>()
            .unwrap()
            .with_param::<String>()
            .unwrap();
    }

    let factory: Arc<dyn Factory1<String, Arc<dyn Test1>>> = container.resolve().unwrap();
    assert_eq!(factory.create("x".into()).unwrap().property(), "x");
    assert_eq!(container.factory_descriptors().len(), 2);
}

#[test]
fn descriptors_describe_signatures() {
    let container = test2_container();
    let descriptors = container.factory_descriptors();

    assert_eq!(descriptors.len(), 1);
    let descriptor = &descriptors[0];
    assert_eq!(descriptor.arity(), FactoryArity::Binary);
    assert!(descriptor.produced().is::<Arc<dyn Test2>>());
    assert!(descriptor.parameters()[0].is::<Option<String>>());
    assert!(descriptor.parameters()[1].is::<Option<Arc<dyn SomeInstance>>>());
    assert_eq!(
        descriptor.to_string(),
        "fn(Option<String>, Option<Arc<dyn SomeInstance>>) -> Arc<dyn Test2>"
    );
}

#[test]
fn callback_can_be_resolved_directly() {
    let container = Container::new();
    container
        .register_auto_factory_for::<Arc<dyn Test1>, TestClass1>()
        .unwrap()
        .with_param::<String>()
        .unwrap();

    let callback: FactoryCallback<(String,), Arc<dyn Test1>> = container.resolve().unwrap();
    assert_eq!(callback.call(("direct".into(),)).unwrap().property(), "direct");

    let resolved: Arc<dyn Test1> = container
        .resolve_with(OverrideSet::new().with("plain".to_string()))
        .unwrap();
    assert_eq!(resolved.property(), "plain");
}
