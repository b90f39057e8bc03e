use serde_json::json;
use stategraph_compiler::{
    CatchHandler, ChoiceBranch, FindStateOptions, GraphHandle, MachineDefinition, StateConfig,
};
use stategraph_types::{matchers, ProcessorConfig, QueryLanguage, RetryPolicy};

#[test]
fn order_pipeline_compiles_to_full_document() {
    let mut machine = MachineDefinition::new();

    let validate = machine.add_state(
        "ValidateOrder",
        StateConfig::of_type("Task")
            .with_field("Resource", json!("resource:validate"))
            .with_comment("Checks the incoming order")
            .with_input_path("$.order")
            .with_result_path("$.validation"),
    );
    let route = machine.add_state("CheckInventory", StateConfig::of_type("Choice"));
    let reserve = machine.add_state(
        "ReserveItems",
        StateConfig::of_type("Map").with_field("ItemsPath", json!("$.validation.items")),
    );
    let payment = machine.add_state(
        "ProcessPayment",
        StateConfig::of_type("Task")
            .with_field("Resource", json!("resource:charge"))
            .with_parameters(json!({ "orderId": "$.order.id", "currency": "USD" })),
    );
    let backorder = machine.add_state(
        "Backorder",
        StateConfig::of_type("Task").with_field("Resource", json!("resource:backorder")),
    );
    let notify = machine.add_state(
        "NotifyFailure",
        StateConfig::of_type("Task").with_field("Resource", json!("resource:notify")),
    );
    let failed = machine.add_state(
        "OrderFailed",
        StateConfig::of_type("Fail")
            .with_field("Error", json!("OrderProcessingFailed"))
            .with_field("Cause", json!("The order could not be processed"))
            .terminal(),
    );
    let done = machine.add_state("OrderComplete", StateConfig::of_type("Succeed").terminal());

    machine
        .set_next(validate, route)
        .expect("first transition should declare");
    machine
        .add_retry(
            validate,
            RetryPolicy::new()
                .with_errors(vec![matchers::TIMEOUT.to_string()])
                .with_interval_seconds(2)
                .with_max_attempts(3),
        )
        .expect("retry rule should declare");
    machine
        .add_catch(validate, CatchHandler::new(notify).with_result_path("$.error"))
        .expect("catch handler should declare");

    machine
        .add_choice(
            route,
            ChoiceBranch::new(
                json!({ "Variable": "$.validation.inStock", "BooleanEquals": true }),
                reserve,
            ),
        )
        .expect("choice branch should declare");
    machine
        .set_default_choice(route, backorder)
        .expect("default choice should declare");

    let reserve_one = machine.add_state(
        "ReserveItem",
        StateConfig::of_type("Task").with_field("Resource", json!("resource:reserve")),
    );
    let body = machine
        .add_graph(reserve_one, "Reservation body")
        .expect("processor body should bind");
    machine
        .set_item_processor(reserve, body, ProcessorConfig::distributed())
        .expect("item processor should attach");
    machine
        .set_next(reserve, payment)
        .expect("reserve transition should declare");

    machine
        .add_retry(
            reserve,
            RetryPolicy::new().with_errors(vec![matchers::BRANCH_FAILED.to_string()]),
        )
        .expect("reserve retry should declare");
    machine
        .add_retry(
            payment,
            RetryPolicy::new()
                .with_errors(vec![matchers::TASK_FAILED.to_string()])
                .with_backoff_rate(2.0),
        )
        .expect("payment retry should declare");
    machine
        .add_retry(payment, RetryPolicy::new().with_max_attempts(2))
        .expect("wildcard retry should declare");
    machine
        .add_catch(payment, CatchHandler::new(notify).with_result_path("$.error"))
        .expect("payment catch should declare");
    machine
        .set_next(payment, done)
        .expect("payment transition should declare");

    machine
        .set_next(backorder, done)
        .expect("backorder transition should declare");
    machine
        .set_next(notify, failed)
        .expect("notify transition should declare");

    let graph = machine
        .add_graph(validate, "Order pipeline")
        .expect("pipeline should bind");
    let document = machine
        .render_graph(graph, None)
        .expect("pipeline should render");

    assert_eq!(
        document,
        json!({
            "StartAt": "ValidateOrder",
            "States": {
                "ValidateOrder": {
                    "Type": "Task",
                    "Resource": "resource:validate",
                    "Comment": "Checks the incoming order",
                    "InputPath": "$.order",
                    "ResultPath": "$.validation",
                    "Retry": [
                        {
                            "ErrorEquals": ["States.Timeout"],
                            "IntervalSeconds": 2,
                            "MaxAttempts": 3,
                        },
                    ],
                    "Catch": [
                        {
                            "ErrorEquals": ["States.ALL"],
                            "ResultPath": "$.error",
                            "Next": "NotifyFailure",
                        },
                    ],
                    "Next": "CheckInventory",
                },
                "CheckInventory": {
                    "Type": "Choice",
                    "Choices": [
                        {
                            "Variable": "$.validation.inStock",
                            "BooleanEquals": true,
                            "Next": "ReserveItems",
                        },
                    ],
                    "Default": "Backorder",
                },
                "ReserveItems": {
                    "Type": "Map",
                    "ItemsPath": "$.validation.items",
                    "ItemProcessor": {
                        "StartAt": "ReserveItem",
                        "States": {
                            "ReserveItem": {
                                "Type": "Task",
                                "Resource": "resource:reserve",
                                "End": true,
                            },
                        },
                        "ProcessorConfig": {
                            "Mode": "DISTRIBUTED",
                            "ExecutionType": "STANDARD",
                        },
                    },
                    "Retry": [
                        { "ErrorEquals": ["States.BranchFailed"] },
                    ],
                    "Next": "ProcessPayment",
                },
                "ProcessPayment": {
                    "Type": "Task",
                    "Resource": "resource:charge",
                    "Parameters": { "orderId.$": "$.order.id", "currency": "USD" },
                    "Retry": [
                        { "ErrorEquals": ["States.TaskFailed"], "BackoffRate": 2.0 },
                        { "ErrorEquals": ["States.ALL"], "MaxAttempts": 2 },
                    ],
                    "Catch": [
                        {
                            "ErrorEquals": ["States.ALL"],
                            "ResultPath": "$.error",
                            "Next": "NotifyFailure",
                        },
                    ],
                    "Next": "OrderComplete",
                },
                "Backorder": {
                    "Type": "Task",
                    "Resource": "resource:backorder",
                    "Next": "OrderComplete",
                },
                "NotifyFailure": {
                    "Type": "Task",
                    "Resource": "resource:notify",
                    "Next": "OrderFailed",
                },
                "OrderFailed": {
                    "Type": "Fail",
                    "Error": "OrderProcessingFailed",
                    "Cause": "The order could not be processed",
                },
                "OrderComplete": {
                    "Type": "Succeed",
                },
            },
        })
    );

    // The processor body is nested inside the pipeline, not a member of it.
    assert_eq!(machine.super_graph(body), Some(graph));
    assert!(!machine.graph_states(graph).contains(&reserve_one));

    let ends = machine.find_reachable_end_states(validate, FindStateOptions::default());
    assert_eq!(ends, vec![done]);
    let ends = machine.find_reachable_end_states(
        validate,
        FindStateOptions {
            include_error_handlers: true,
        },
    );
    assert_eq!(ends, vec![failed, done]);
}

#[test]
fn prefixed_branches_compile_with_distinct_identifiers() {
    fn job_branch(machine: &mut MachineDefinition, description: &str) -> GraphHandle {
        let run = machine.add_state(
            "Run",
            StateConfig::of_type("Task").with_field("Resource", json!("resource:run")),
        );
        let verify = machine.add_state(
            "Verify",
            StateConfig::of_type("Task").with_field("Resource", json!("resource:verify")),
        );
        machine
            .set_next(run, verify)
            .expect("job transition should declare");
        machine
            .add_graph(run, description)
            .expect("job branch should bind")
    }

    let mut machine = MachineDefinition::new();
    let first = job_branch(&mut machine, "First job");
    let second = job_branch(&mut machine, "Second job");
    machine.prefix_states(first, "Primary");
    machine.prefix_states(second, "Replica");

    let fan = machine.add_state("FanOut", StateConfig::of_type("Parallel"));
    let done = machine.add_state("Done", StateConfig::of_type("Succeed").terminal());
    machine
        .add_branch(fan, first)
        .expect("first branch should attach");
    machine
        .add_branch(fan, second)
        .expect("second branch should attach");
    machine
        .set_next(fan, done)
        .expect("fan transition should declare");

    let graph = machine
        .add_graph(fan, "Dual run")
        .expect("outer graph should bind");
    let document = machine
        .render_graph(graph, None)
        .expect("outer graph should render");

    let branches = document["States"]["FanOut"]["Branches"]
        .as_array()
        .expect("parallel state should carry branches");
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0]["StartAt"], json!("PrimaryRun"));
    assert_eq!(
        branches[0]["States"]["PrimaryRun"]["Next"],
        json!("PrimaryVerify")
    );
    assert_eq!(branches[1]["StartAt"], json!("ReplicaRun"));
    assert_eq!(
        branches[1]["States"]["ReplicaRun"]["Next"],
        json!("ReplicaVerify")
    );
}

#[test]
fn parallel_branch_containing_a_processor_compiles() {
    let mut machine = MachineDefinition::new();

    let resize = machine.add_state(
        "ResizeImage",
        StateConfig::of_type("Task").with_field("Resource", json!("resource:resize")),
    );
    let processor_body = machine
        .add_graph(resize, "Resize body")
        .expect("processor body should bind");

    let each_image = machine.add_state(
        "EachImage",
        StateConfig::of_type("Map").with_field("ItemsPath", json!("$.images")),
    );
    machine
        .set_item_processor(each_image, processor_body, ProcessorConfig::inline())
        .expect("item processor should attach");
    let media_branch = machine
        .add_graph(each_image, "Media branch")
        .expect("media branch should bind");

    let index = machine.add_state(
        "IndexDocument",
        StateConfig::of_type("Task").with_field("Resource", json!("resource:index")),
    );
    let index_branch = machine
        .add_graph(index, "Index branch")
        .expect("index branch should bind");

    let fan = machine.add_state("ProcessUpload", StateConfig::of_type("Parallel"));
    machine
        .add_branch(fan, media_branch)
        .expect("media branch should attach");
    machine
        .add_branch(fan, index_branch)
        .expect("index branch should attach");
    let graph = machine
        .add_graph(fan, "Upload pipeline")
        .expect("pipeline should bind");

    machine.prefix_states(graph, "Upload");
    let document = machine
        .render_graph(graph, None)
        .expect("pipeline should render");

    // Prefixing reaches through both nesting levels.
    let media = &document["States"]["UploadProcessUpload"]["Branches"][0];
    assert_eq!(media["StartAt"], json!("UploadEachImage"));
    assert_eq!(
        media["States"]["UploadEachImage"]["ItemProcessor"],
        json!({
            "StartAt": "UploadResizeImage",
            "States": {
                "UploadResizeImage": {
                    "Type": "Task",
                    "Resource": "resource:resize",
                    "End": true,
                },
            },
            "ProcessorConfig": { "Mode": "INLINE" },
        })
    );

    assert_eq!(machine.super_graph(media_branch), Some(graph));
    assert_eq!(machine.super_graph(processor_body), Some(media_branch));
}

#[test]
fn expression_pipeline_uses_expression_fields() {
    let mut machine = MachineDefinition::new();
    let score = machine.add_state(
        "ScoreOrder",
        StateConfig::of_type("Task")
            .with_field("Resource", json!("resource:score"))
            .with_arguments(json!({ "order": "{% $states.input %}" }))
            .with_assigned("score", json!("{% $states.result.score %}"))
            .with_assigned("raw", json!("$literal")),
    );
    let gate = machine.add_state("GateOnScore", StateConfig::of_type("Choice"));
    let approve = machine.add_state("Approve", StateConfig::of_type("Succeed").terminal());
    let review = machine.add_state(
        "Review",
        StateConfig::of_type("Task").with_field("Resource", json!("resource:review")),
    );

    machine
        .set_next(score, gate)
        .expect("score transition should declare");
    machine
        .add_choice(
            gate,
            ChoiceBranch::new(json!("{% $score > 0.8 %}"), approve)
                .with_output(json!({ "routedBy": "gate" })),
        )
        .expect("gate branch should declare");
    machine
        .set_default_choice(gate, review)
        .expect("gate default should declare");

    let graph = machine
        .add_graph(score, "Scoring")
        .expect("scoring graph should bind");
    let document = machine
        .render_graph(graph, Some(QueryLanguage::Jsonata))
        .expect("scoring graph should render");

    let score_state = &document["States"]["ScoreOrder"];
    assert_eq!(
        score_state["Arguments"],
        json!({ "order": "{% $states.input %}" })
    );
    // Under the expression dialect assignments render verbatim.
    assert_eq!(
        score_state["Assign"],
        json!({ "score": "{% $states.result.score %}", "raw": "$literal" })
    );
    assert!(
        !score_state
            .as_object()
            .expect("state should be an object")
            .contains_key("QueryLanguage"),
        "expression root makes per-state annotations redundant"
    );

    assert_eq!(
        document["States"]["GateOnScore"]["Choices"][0],
        json!({
            "Condition": "{% $score > 0.8 %}",
            "Output": { "routedBy": "gate" },
            "Next": "Approve",
        })
    );
}
