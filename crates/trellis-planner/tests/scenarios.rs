use std::collections::BTreeSet;

use trellis_core::prelude::*;
use trellis_planner::{ConstructionExpression, Planner, PlannerOptions, RegistrationPlan};

fn ty(name: &str) -> TypeRef {
    TypeRef::new(format!("Shop.{name}"), "Shop")
}

fn depends_on(name: &str, dependencies: &[&str]) -> CandidateType {
    let ctor = dependencies
        .iter()
        .fold(Constructor::new(), |ctor, dep| ctor.param(Parameter::service(ty(dep))));
    CandidateType::new(ty(name)).constructor(ctor)
}

fn plan(candidates: &[CandidateType]) -> RegistrationPlan {
    Planner::default().plan(candidates)
}

fn json(plan: &RegistrationPlan) -> String {
    serde_json::to_string(plan).unwrap()
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn test_two_service_cycle() {
    let candidates = vec![
        depends_on("OrderService", &["IInventoryService"]).implements(ty("IOrderService")),
        depends_on("InventoryService", &["IOrderService"]).implements(ty("IInventoryService")),
        CandidateType::new(ty("Clock")).implements(ty("IClock")),
    ];
    let plan = plan(&candidates);

    let messages: Vec<&str> = plan
        .diagnostics()
        .of_kind(DiagnosticKind::CircularDependency)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            concat!(
                "circular dependency: ",
                "Shop.InventoryService → Shop.OrderService → Shop.InventoryService"
            ),
            concat!(
                "circular dependency: ",
                "Shop.OrderService → Shop.InventoryService → Shop.OrderService"
            ),
        ]
    );
    assert!(plan.is_withheld(&ty("OrderService")));
    assert!(plan.is_withheld(&ty("InventoryService")));
    assert!(plan.is_registered(&ty("Clock")));
}

#[test]
fn test_singleton_capturing_scoped_disposable() {
    let candidates = vec![
        depends_on("CacheService", &["IDbContext"]).implements(ty("ICacheService")),
        CandidateType::new(ty("DbContext"))
            .implements(ty("IDbContext"))
            .lifetime(Lifetime::Scoped)
            .disposable(),
    ];
    let plan = plan(&candidates);

    let errors: Vec<&Diagnostic> = plan.diagnostics().errors().collect();
    assert_eq!(errors.len(), 1);
    let error = errors[0];
    assert_eq!(error.kind, DiagnosticKind::DisposableCaptiveDependency);
    for fragment in ["Shop.CacheService", "Shop.DbContext", "Singleton", "Scoped"] {
        assert!(error.message.contains(fragment), "missing {fragment}: {}", error.message);
    }
    assert!(plan.is_withheld(&ty("CacheService")));
    assert!(plan.is_registered(&ty("DbContext")));
}

#[test]
fn test_decorator_chain_rendering() {
    let decorator = |name: &str, order: i32| {
        depends_on(name, &["IOrderService"])
            .implements(ty("IOrderService"))
            .decorates(ty("IOrderService"), order)
    };
    let candidates = vec![
        decorator("CachingDecorator", 2),
        CandidateType::new(ty("OrderService")).implements(ty("IOrderService")),
        decorator("LoggingDecorator", 1),
    ];
    let plan = plan(&candidates);

    let chain = plan.decorator_chain(&ty("IOrderService")).unwrap();
    assert_eq!(
        chain.wrap(&ty("OrderService")),
        "CachingDecorator(LoggingDecorator(OrderService))"
    );
    let registrations = plan.registrations_for(&ty("IOrderService"));
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].implementation, ty("OrderService"));
}

#[test]
fn test_cycle_through_decorator() {
    // Resolving IBar builds Bar, whose IFoo is wrapped by Guard, which needs IBar.
    let candidates = vec![
        depends_on("Bar", &["IFoo"]).implements(ty("IBar")),
        CandidateType::new(ty("Foo")).implements(ty("IFoo")),
        depends_on("Guard", &["IFoo", "IBar"])
            .implements(ty("IFoo"))
            .decorates(ty("IFoo"), 0),
    ];
    let plan = plan(&candidates);

    let subjects: BTreeSet<&str> = plan
        .diagnostics()
        .of_kind(DiagnosticKind::CircularDependency)
        .filter_map(Diagnostic::subject)
        .map(TypeRef::short_name)
        .collect();
    assert_eq!(subjects, BTreeSet::from(["Bar", "Guard"]));
    assert!(plan.has_errors());
    assert!(plan.is_withheld(&ty("Bar")));
    assert!(plan.is_withheld(&ty("Guard")));
    assert!(plan.is_registered(&ty("Foo")));
    assert!(plan.decorator_chain(&ty("IFoo")).is_none());
}

#[test]
fn test_singleton_capturing_scoped_decorator() {
    let candidates = vec![
        depends_on("Reporting", &["IFoo"]).implements(ty("IReporting")),
        CandidateType::new(ty("Foo")).implements(ty("IFoo")),
        depends_on("UnitOfWork", &["IFoo"])
            .implements(ty("IFoo"))
            .decorates(ty("IFoo"), 0)
            .lifetime(Lifetime::Scoped)
            .disposable(),
    ];
    let plan = plan(&candidates);

    let errors: Vec<&Diagnostic> = plan.diagnostics().errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::DisposableCaptiveDependency);
    assert_eq!(errors[0].affected, vec![ty("Reporting"), ty("UnitOfWork")]);
    assert!(plan.is_withheld(&ty("Reporting")));
    assert!(!plan.is_withheld(&ty("UnitOfWork")));
    assert!(plan.decorator_chain(&ty("IFoo")).is_some());
}

#[test]
fn test_interceptors_with_equal_order_sort_by_name() {
    let candidates = vec![
        CandidateType::new(ty("Checkout"))
            .implements(ty("ICheckout"))
            .method("Pay")
            .intercepted_by(ty("Zeta"), 0)
            .intercepted_by(ty("Alpha"), 0)
            .intercepted_by(ty("Audit"), -1),
    ];
    let plan = plan(&candidates);

    let chains = plan.interceptor_chains();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].method, "Pay");
    let order: Vec<&str> = chains[0]
        .interceptors
        .iter()
        .map(|link| link.interceptor.short_name())
        .collect();
    assert_eq!(order, vec!["Audit", "Alpha", "Zeta"]);
}

#[test]
fn test_plugin_sequence() {
    let candidates = vec![
        CandidateType::new(ty("Metrics")).plugin_order(100),
        CandidateType::new(ty("Zeta")).plugin_order(0),
        CandidateType::new(ty("Migrations")).plugin_order(-100),
        CandidateType::new(ty("Cache")).plugin_order(50),
        CandidateType::new(ty("Alpha")).plugin_order(0),
        CandidateType::new(ty("Config")).plugin_order(-50),
    ];
    let plan = plan(&candidates);

    let order: Vec<&str> = plan.plugins().identities().map(TypeRef::short_name).collect();
    assert_eq!(
        order,
        vec!["Migrations", "Config", "Alpha", "Zeta", "Cache", "Metrics"]
    );
}

// ─── Properties ───────────────────────────────────────────────────────────────

#[test]
fn test_every_cycle_participant_reported_once() {
    // Ring A → B → C → D → A, a self-loop on E, and acyclic consumers F, G.
    let candidates = vec![
        depends_on("A", &["B"]),
        depends_on("B", &["C"]),
        depends_on("C", &["D"]),
        depends_on("D", &["A"]),
        depends_on("E", &["E", "G"]),
        depends_on("F", &["A", "E"]),
        depends_on("G", &[]),
    ];
    let plan = plan(&candidates);

    let subjects: Vec<&str> = plan
        .diagnostics()
        .of_kind(DiagnosticKind::CircularDependency)
        .filter_map(Diagnostic::subject)
        .map(TypeRef::short_name)
        .collect();
    assert_eq!(subjects, vec!["A", "B", "C", "D", "E"]);

    let withheld: BTreeSet<&str> = plan
        .withheld()
        .iter()
        .map(|w| w.implementation.short_name())
        .collect();
    assert_eq!(withheld, BTreeSet::from(["A", "B", "C", "D", "E", "F"]));
    assert!(plan.is_registered(&ty("G")));
}

fn rich_candidates() -> Vec<CandidateType> {
    vec![
        depends_on("OrderService", &["IInventoryService", "IClock"])
            .implements(ty("IOrderService"))
            .method("Place")
            .intercepted_by(ty("AuditInterceptor"), 1)
            .intercepted_by(ty("TimingInterceptor"), 0),
        CandidateType::new(ty("InventoryService"))
            .implements(ty("IInventoryService"))
            .lifetime(Lifetime::Scoped),
        CandidateType::new(ty("Clock"))
            .implements(ty("IClock"))
            .implements(ty("ITimeSource"))
            .keyed("utc"),
        depends_on("LoggingDecorator", &["IOrderService"])
            .implements(ty("IOrderService"))
            .decorates(ty("IOrderService"), 1),
        depends_on("CachingDecorator", &["IOrderService"])
            .implements(ty("IOrderService"))
            .decorates(ty("IOrderService"), 1),
        CandidateType::new(ty("Seeder")).plugin_order(0),
        CandidateType::new(ty("Warmup")).plugin_order(0),
        CandidateType::new(ty("Worker")).background_service(),
        depends_on("Loop", &["Loop"]),
        CandidateType::new(ty("Broadcaster")).constructor(
            Constructor::new()
                .param(Parameter::service(ty("IHandler")).collection())
                .param(Parameter::service(ty("IClock")).keyed("local")),
        ),
    ]
}

#[test]
fn test_plan_is_independent_of_input_order() {
    let forward = rich_candidates();
    let mut reversed = forward.clone();
    reversed.reverse();
    let mut rotated = forward.clone();
    rotated.rotate_left(4);

    let planner = Planner::new(PlannerOptions::default().strict_plugin_order(true));
    let expected = json(&planner.plan(&forward));
    assert_eq!(json(&planner.plan(&reversed)), expected);
    assert_eq!(json(&planner.plan(&rotated)), expected);
    assert_eq!(json(&planner.plan(&forward)), expected);
}

#[test]
fn test_captivity_across_resolution_kinds() {
    let consumer = |parameter: Parameter| {
        CandidateType::new(ty("Consumer")).constructor(Constructor::new().param(parameter))
    };
    let dependency = CandidateType::new(ty("Session"))
        .implements(ty("ISession"))
        .keyed("main")
        .lifetime(Lifetime::Transient)
        .disposable();

    let cases = [
        (Parameter::service(ty("ISession")), true),
        (Parameter::service(ty("ISession")).keyed("main"), true),
        (Parameter::service(ty("ISession")).lazy(), false),
        (Parameter::service(ty("ISession")).factory(), false),
        (Parameter::service(ty("ISession")).collection(), false),
    ];
    for (parameter, captive) in cases {
        let label = parameter.resolution.label();
        let plan = plan(&[consumer(parameter), dependency.clone()]);
        let found = plan
            .diagnostics()
            .of_kind(DiagnosticKind::DisposableCaptiveDependency)
            .count();
        assert_eq!(found == 1, captive, "resolution {label}");
    }
}

#[test]
fn test_decorator_orders_construct_innermost_first() {
    let candidates = vec![
        CandidateType::new(ty("Base")).implements(ty("IService")),
        depends_on("Two", &["IService"]).implements(ty("IService")).decorates(ty("IService"), 2),
        depends_on("One", &["IService"]).implements(ty("IService")).decorates(ty("IService"), 1),
        depends_on("Zero", &["IService"]).implements(ty("IService")).decorates(ty("IService"), 0),
    ];
    let plan = plan(&candidates);
    let chain = plan.decorator_chain(&ty("IService")).unwrap();

    let construction: Vec<&str> = chain.construction_order().map(TypeRef::short_name).collect();
    let resolution: Vec<&str> = chain.resolution_order().map(TypeRef::short_name).collect();
    assert_eq!(construction, vec!["Zero", "One", "Two"]);
    assert_eq!(resolution, vec!["Two", "One", "Zero"]);
}

#[test]
fn test_background_service_with_settings_parameter_is_registered() {
    let candidates = vec![
        CandidateType::new(ty("OutboxRelay")).background_service().constructor(
            Constructor::new()
                .param(Parameter::service(ty("IQueue")))
                .param(Parameter::primitive(ty("Int32"))),
        ),
    ];
    let plan = plan(&candidates);

    assert!(plan.is_registered(&ty("OutboxRelay")));
    assert_eq!(plan.registrations()[0].lifetime, Lifetime::Singleton);
}

#[test]
fn test_parameterless_constructor_defaults_to_singleton() {
    let candidates = vec![
        CandidateType::new(ty("Clock"))
            .implements(ty("IClock"))
            .constructor(Constructor::new()),
    ];
    let plan = plan(&candidates);
    let registration = &plan.registrations()[0];
    assert_eq!(registration.lifetime, Lifetime::Singleton);
    assert_eq!(
        registration.construction,
        ConstructionExpression::Construct { arguments: vec![] }
    );
}
