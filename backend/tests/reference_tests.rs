//! Reference data tests: uniqueness, soft deletion and unit bindings

mod common;

use common::*;
use shared::{NewMaterial, ReferenceKind};
use stockledger_backend::error::AppError;
use uuid::Uuid;

#[tokio::test]
async fn test_duplicate_names_are_rejected_case_insensitively() {
    let fx = Fixture::new().await;
    fx.material("Portland Cement", "0").await;

    let result = fx
        .references
        .create_material(
            &fx.actor,
            NewMaterial {
                name: "  portland cement ".to_string(),
                category_id: fx.category.id,
                min_stock_level: None,
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::DuplicateName {
            entity: ReferenceKind::Material,
            ..
        })
    ));

    let project = fx
        .references
        .create_reference(&fx.actor, ReferenceKind::Project, reference("NORTH WING"))
        .await;
    assert!(matches!(
        project,
        Err(AppError::DuplicateName {
            entity: ReferenceKind::Project,
            ..
        })
    ));
}

#[tokio::test]
async fn test_material_requires_active_category() {
    let fx = Fixture::new().await;
    let result = fx
        .references
        .create_material(
            &fx.actor,
            NewMaterial {
                name: "Steel".to_string(),
                category_id: Uuid::new_v4(),
                min_stock_level: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_negative_minimum_level_is_rejected() {
    let fx = Fixture::new().await;
    let result = fx
        .references
        .create_material(
            &fx.actor,
            NewMaterial {
                name: "Steel".to_string(),
                category_id: fx.category.id,
                min_stock_level: Some(dec("-1")),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation { ref field, .. }) if field == "min_stock_level"));
}

#[tokio::test]
async fn test_unit_requires_abbreviation() {
    let fx = Fixture::new().await;
    let result = fx
        .references
        .create_reference(&fx.actor, ReferenceKind::Unit, reference("Litre"))
        .await;
    assert!(matches!(result, Err(AppError::Validation { ref field, .. }) if field == "abbreviation"));
}

#[tokio::test]
async fn test_referenced_entities_cannot_be_deactivated() {
    let fx = Fixture::new().await;
    let cement = fx.material("Cement", "0").await;
    fx.receive(cement.id, "10").await;

    let blocked = fx
        .references
        .deactivate(&fx.actor, ReferenceKind::Unit, fx.unit.id)
        .await;
    match blocked {
        Err(AppError::ReferentialIntegrity { dependents, .. }) => {
            assert_eq!(dependents.inflows, 1);
            assert_eq!(dependents.outflows, 0);
        }
        other => panic!("expected ReferentialIntegrity, got {:?}", other),
    }

    let category = fx
        .references
        .deactivate(&fx.actor, ReferenceKind::Category, fx.category.id)
        .await;
    assert!(matches!(
        category,
        Err(AppError::ReferentialIntegrity { ref dependents, .. }) if dependents.materials == 1
    ));
}

#[tokio::test]
async fn test_deactivated_project_stays_listed_but_refuses_events() {
    let fx = Fixture::new().await;
    let cement = fx.material("Cement", "0").await;
    let annex = fx.project("Annex").await;

    fx.references
        .deactivate(&fx.actor, ReferenceKind::Project, annex.id)
        .await
        .unwrap();

    let projects = fx
        .references
        .list_references(&fx.actor, ReferenceKind::Project)
        .await
        .unwrap();
    assert_eq!(projects.len(), 2);

    let mut input = fx.new_inflow(cement.id, "5");
    input.project_id = annex.id;
    let result = fx.ledger.record_inflow(&fx.actor, input).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_deactivating_unknown_entity_is_not_found() {
    let fx = Fixture::new().await;
    let result = fx
        .references
        .deactivate(&fx.actor, ReferenceKind::Category, Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_unit_binding_is_stored_not_applied() {
    let fx = Fixture::new().await;
    let cement = fx.material("Cement", "0").await;
    fx.receive(cement.id, "10").await;

    let binding = fx
        .references
        .bind_material_unit(&fx.actor, cement.id, fx.unit.id, dec("50"))
        .await
        .unwrap();
    assert_eq!(binding.conversion_factor, dec("50"));

    // Rebinding replaces the factor
    fx.references
        .bind_material_unit(&fx.actor, cement.id, fx.unit.id, dec("25"))
        .await
        .unwrap();
    let bindings = fx
        .references
        .list_material_units(&fx.actor, cement.id)
        .await
        .unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].conversion_factor, dec("25"));

    let zero = fx
        .references
        .bind_material_unit(&fx.actor, cement.id, fx.unit.id, dec("0"))
        .await;
    assert!(matches!(zero, Err(AppError::Validation { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_deactivation_never_strands_live_events() {
    let fx = Fixture::new().await;
    let sand = fx.material("Sand", "0").await;

    for round in 0..50 {
        let site = fx.project(&format!("Site {}", round)).await;
        let mut input = fx.new_inflow(sand.id, "1");
        input.project_id = site.id;

        let inflow = {
            let ledger = fx.ledger.clone();
            let actor = fx.actor.clone();
            tokio::spawn(async move { ledger.record_inflow(&actor, input).await })
        };
        let deactivation = {
            let references = fx.references.clone();
            let actor = fx.actor.clone();
            let id = site.id;
            tokio::spawn(
                async move { references.deactivate(&actor, ReferenceKind::Project, id).await },
            )
        };
        let inflow = inflow.await.unwrap();
        let deactivation = deactivation.await.unwrap();

        match (&inflow, &deactivation) {
            (Ok(_), Err(AppError::ReferentialIntegrity { dependents, .. })) => {
                assert_eq!(dependents.inflows, 1)
            }
            (Err(AppError::NotFound(_)), Ok(())) => {}
            other => panic!("round {}: inconsistent outcome {:?}", round, other),
        }

        let filter = shared::EventFilter {
            project_id: Some(site.id),
            ..shared::EventFilter::default()
        };
        let events = fx
            .ledger
            .list_events(&fx.actor, shared::EventKind::Inflow, filter)
            .await
            .unwrap();
        assert_eq!(events.len(), usize::from(inflow.is_ok()));
    }
}

#[tokio::test]
async fn test_material_deactivation_counts_committed_events() {
    let fx = Fixture::new().await;
    let gravel = fx.material("Gravel", "0").await;
    fx.receive(gravel.id, "4").await;

    let result = fx
        .references
        .deactivate(&fx.actor, ReferenceKind::Material, gravel.id)
        .await;
    match result {
        Err(AppError::ReferentialIntegrity { dependents, .. }) => {
            assert_eq!(dependents.inflows, 1);
            assert_eq!(dependents.outflows, 0);
        }
        other => panic!("expected ReferentialIntegrity, got {:?}", other),
    }
    let materials = fx.references.list_materials(&fx.actor).await.unwrap();
    assert!(materials.iter().all(|m| m.is_active));
}
