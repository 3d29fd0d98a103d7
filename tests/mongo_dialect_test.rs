use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value, json};

use shadow_search::{
    ExpressionDialect, HookOptions, MongoDialect, OperatorNormalizer, SchemaDescription,
    SchemaField, ShadowConfig, ShadowEngine, TokenizerProgram, UpdateQuery, tokenize,
};

// Host-side evaluator for the aggregation operators the Mongo dialect and
// the recomputation stages emit. `None` stands for a missing value.
// `$toLower` folds ASCII only and regexes use the store's option letters,
// so the store's own behavior is what gets checked.

fn lookup(value: &Value, path: &str) -> Option<Value> {
    let mut value = value;
    for segment in path.split('.') {
        value = value.as_object()?.get(segment)?;
    }
    Some(value.clone())
}

fn truthy(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

fn text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

fn int(value: Option<Value>) -> i64 {
    value.and_then(|v| v.as_i64()).unwrap()
}

fn items(value: Option<Value>) -> Option<Vec<Value>> {
    match value {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn compile_regex(body: &Value) -> Regex {
    let flags = body.get("options").and_then(Value::as_str).unwrap_or("");
    let pattern = body["regex"].as_str().unwrap();
    if flags.is_empty() {
        Regex::new(pattern).unwrap()
    } else {
        Regex::new(&format!("(?{flags}){pattern}")).unwrap()
    }
}

fn regex_matches(body: &Value, root: &Value, vars: &Map<String, Value>) -> Vec<Value> {
    let input = text(eval(&body["input"], root, vars));
    compile_regex(body)
        .captures_iter(&input)
        .map(|caps| {
            let captures: Vec<Value> = caps
                .iter()
                .skip(1)
                .map(|c| c.map_or(Value::Null, |m| Value::from(m.as_str())))
                .collect();
            json!({ "match": &caps[0], "captures": captures })
        })
        .collect()
}

fn with_var(vars: &Map<String, Value>, name: &str, value: Option<Value>) -> Map<String, Value> {
    let mut scope = vars.clone();
    match value {
        Some(value) => scope.insert(name.to_string(), value),
        None => scope.remove(name),
    };
    scope
}

fn eval(expr: &Value, root: &Value, vars: &Map<String, Value>) -> Option<Value> {
    let object = match expr {
        Value::String(s) if s.starts_with("$$") => {
            return match s[2..].split_once('.') {
                Some((name, path)) => vars.get(name).and_then(|bound| lookup(bound, path)),
                None => vars.get(&s[2..]).cloned(),
            };
        }
        Value::String(s) if s.starts_with('$') => return lookup(root, &s[1..]),
        Value::Array(list) => {
            return Some(Value::Array(
                list.iter()
                    .map(|item| eval(item, root, vars).unwrap_or(Value::Null))
                    .collect(),
            ));
        }
        Value::Object(object) => object,
        other => return Some(other.clone()),
    };
    let Some((operator, body)) = object.iter().next().filter(|(k, _)| k.starts_with('$')) else {
        let fields = object
            .iter()
            .filter_map(|(k, v)| eval(v, root, vars).map(|v| (k.clone(), v)))
            .collect();
        return Some(Value::Object(fields));
    };
    let arg = |i: usize| eval(&body[i], root, vars);
    let value = match operator.as_str() {
        "$literal" => body.clone(),
        "$let" => {
            let mut scope = vars.clone();
            for (name, value) in body["vars"].as_object().unwrap() {
                scope = with_var(&scope, name, eval(value, root, vars));
            }
            return eval(&body["in"], root, &scope);
        }
        "$cond" => return if truthy(&arg(0)) { arg(1) } else { arg(2) },
        "$eq" => Value::Bool(arg(0) == arg(1)),
        "$not" => Value::Bool(!truthy(&arg(0))),
        "$type" => Value::from(match eval(body, root, vars) {
            None => "missing",
            Some(Value::Null) => "null",
            Some(Value::String(_)) => "string",
            Some(Value::Object(_)) => "object",
            Some(Value::Array(_)) => "array",
            Some(Value::Bool(_)) => "bool",
            Some(Value::Number(_)) => "double",
        }),
        "$isArray" => Value::Bool(matches!(arg(0), Some(Value::Array(_)))),
        "$toLower" => Value::from(text(eval(body, root, vars)).to_ascii_lowercase()),
        "$replaceAll" => {
            let input = text(eval(&body["input"], root, vars));
            let find = text(eval(&body["find"], root, vars));
            let replacement = text(eval(&body["replacement"], root, vars));
            Value::from(input.replace(&find, &replacement))
        }
        "$regexFindAll" => Value::Array(regex_matches(body, root, vars)),
        "$regexFind" => regex_matches(body, root, vars)
            .into_iter()
            .next()
            .unwrap_or(Value::Null),
        "$strLenCP" => Value::from(text(eval(body, root, vars)).chars().count()),
        "$substrCP" => {
            let start = int(arg(1)) as usize;
            let len = int(arg(2)) as usize;
            Value::from(text(arg(0)).chars().skip(start).take(len).collect::<String>())
        }
        "$range" => Value::Array((int(arg(0))..int(arg(1))).map(Value::from).collect()),
        "$concat" => {
            let mut out = String::new();
            for part in body.as_array().unwrap() {
                match eval(part, root, vars) {
                    Some(Value::String(s)) => out.push_str(&s),
                    _ => return Some(Value::Null),
                }
            }
            Value::from(out)
        }
        "$concatArrays" => {
            let mut out = Vec::new();
            for part in body.as_array().unwrap() {
                out.extend(items(eval(part, root, vars))?);
            }
            Value::Array(out)
        }
        "$in" => Value::Bool(
            items(arg(1))
                .unwrap()
                .contains(&arg(0).unwrap_or(Value::Null)),
        ),
        "$ifNull" => match arg(0) {
            None | Some(Value::Null) => return arg(1),
            value => return value,
        },
        "$arrayElemAt" => {
            let index = int(arg(1)) as usize;
            return items(arg(0))?.into_iter().nth(index);
        }
        "$mergeObjects" => {
            let mut merged = Map::new();
            for part in body.as_array().unwrap() {
                if let Some(Value::Object(part)) = eval(part, root, vars) {
                    merged.extend(part);
                }
            }
            Value::Object(merged)
        }
        "$map" => {
            let var = body["as"].as_str().unwrap();
            let Some(list) = items(eval(&body["input"], root, vars)) else {
                return Some(Value::Null);
            };
            Value::Array(
                list.into_iter()
                    .map(|item| {
                        let scope = with_var(vars, var, Some(item));
                        eval(&body["in"], root, &scope).unwrap_or(Value::Null)
                    })
                    .collect(),
            )
        }
        "$filter" => {
            let var = body["as"].as_str().unwrap();
            let list = items(eval(&body["input"], root, vars))?;
            Value::Array(
                list.into_iter()
                    .filter(|item| {
                        let scope = with_var(vars, var, Some(item.clone()));
                        truthy(&eval(&body["cond"], root, &scope))
                    })
                    .collect(),
            )
        }
        "$reduce" => {
            let Some(list) = items(eval(&body["input"], root, vars)) else {
                return Some(Value::Null);
            };
            let mut acc = eval(&body["initialValue"], root, vars);
            for item in list {
                let scope = with_var(&with_var(vars, "value", acc), "this", Some(item));
                acc = eval(&body["in"], root, &scope);
            }
            return acc;
        }
        other => panic!("unsupported operator {other}"),
    };
    Some(value)
}

fn store_tokenize(input: Value) -> Option<Value> {
    let expr = MongoDialect.tokenize(json!("$texte"), &TokenizerProgram::french());
    eval(&expr, &json!({ "texte": input }), &Map::new())
}

fn apply(pipeline: &[Value], doc: &mut Value) {
    for stage in pipeline {
        let current = doc.clone();
        if let Some(fields) = stage["$unset"].as_array() {
            for field in fields {
                doc.as_object_mut().unwrap().remove(field.as_str().unwrap());
            }
            continue;
        }
        let set = stage["$set"].as_object().expect("only $set and $unset stages are replayed");
        for (path, expr) in set {
            assert!(!path.contains('.'), "dotted assignment {path}");
            match eval(expr, &current, &Map::new()) {
                Some(value) => doc.as_object_mut().unwrap().insert(path.clone(), value),
                None => doc.as_object_mut().unwrap().remove(path),
            };
        }
    }
}

#[test]
fn test_store_tokenizer_matches_host() {
    for input in [
        "L'École d’été…",
        "Le Système Répond Rapidement.",
        "ÉTAT À ÇA Œuvre Ÿ Ñandú",
        "prix\u{a0}unitaire\u{202f}: douze\u{2003}euros",
        "Qu’il S'EST « perdu » !",
        "chat chien abc abcd",
        "... !!! « » ' ’",
        "l' d’",
        "tab\tet\nligne",
        "",
        "   ",
    ] {
        assert_eq!(
            store_tokenize(json!(input)),
            Some(json!(tokenize(input))),
            "input {input:?}"
        );
    }
}

#[test]
fn test_store_tokenizer_edge_values() {
    assert_eq!(store_tokenize(json!("abc abcd")), Some(json!("abc")));
    assert_eq!(store_tokenize(json!("abc")), Some(json!("")));
    assert_eq!(store_tokenize(json!("École")), Some(json!("éco écol")));
    assert_eq!(store_tokenize(json!("")), Some(json!("")));
    assert_eq!(store_tokenize(json!(42)), Some(json!("")));
    assert_eq!(store_tokenize(Value::Null), Some(json!("")));

    let expr = MongoDialect.tokenize(json!("$texte"), &TokenizerProgram::french());
    assert_eq!(eval(&expr, &json!({}), &Map::new()), Some(json!("")));
}

#[test]
fn test_store_steps_one_by_one() {
    use shadow_search::Step;

    let single = |step: Step, input: &str| {
        let mut steps = vec![Step::SplitWhitespace];
        steps.push(step);
        steps.push(Step::Join {
            separator: "|".into(),
        });
        let program = TokenizerProgram::new(steps).unwrap();
        let expr = MongoDialect.tokenize(json!("$texte"), &program);
        let store = eval(&expr, &json!({ "texte": input }), &Map::new());
        assert_eq!(store, Some(json!(program.evaluate(input))), "{input:?}");
        store
    };

    assert_eq!(
        single(Step::TrimChars { chars: ".,«»".into() }, "«mot» ... .a."),
        Some(json!("mot||a"))
    );
    assert_eq!(
        single(
            Step::StripElision {
                prefixes: vec!["l".into(), "qu".into()],
                apostrophes: "'’".into(),
            },
            "L'arbre qu’il lune l'"
        ),
        Some(json!("arbre|il|lune|"))
    );
    assert_eq!(
        single(Step::Prefixes { min_len: 3 }, "ab abc abcd"),
        Some(json!("abc"))
    );
    assert_eq!(single(Step::Dedupe, "a b a c b"), Some(json!("a|b|c")));
}

fn schema() -> SchemaDescription {
    SchemaDescription::new(vec![
        SchemaField::scalar("titre").tracked(),
        SchemaField::object("details", vec![SchemaField::scalar("commentaire").tracked()]),
        SchemaField::array(
            "lignes",
            vec![
                SchemaField::scalar("libelle").tracked(),
                SchemaField::object("meta", vec![SchemaField::scalar("note").tracked()]),
            ],
        ),
    ])
}

fn engine() -> ShadowEngine {
    ShadowEngine::from_schema(&schema(), ShadowConfig::default(), Arc::new(OperatorNormalizer))
        .unwrap()
}

#[test]
fn test_default_dialect_seed_and_rewrite_converge() -> shadow_search::Result<()> {
    let engine = engine();
    let source = json!({
        "titre": "L'ÉTÉ À Paris\u{a0}!",
        "details": { "commentaire": "Œuvre d’Émile Zola" },
        "lignes": [
            { "libelle": "Écharpe en laine", "meta": { "note": "Très Élégante" } },
            { "libelle": "Chapeau" },
            { "libelle": 12 }
        ]
    });
    let mut seeded = source.clone();
    engine.before_save(&mut seeded, HookOptions::default());

    let mut query = UpdateQuery::new(
        json!({}),
        json!({ "$set": {
            "titre": source["titre"],
            "details": source["details"],
            "lignes": source["lignes"],
        }}),
    );
    assert!(engine.before_update(&mut query, HookOptions::default())?);
    let mut replayed = json!({});
    apply(query.update.unwrap().as_array().unwrap(), &mut replayed);
    assert_eq!(replayed, seeded);
    assert!(replayed["lignes"][1].get("meta").is_none());
    Ok(())
}

#[test]
fn test_unset_parent_is_not_recreated() -> shadow_search::Result<()> {
    let engine = engine();
    let mut doc = json!({ "titre": "Carnet", "details": { "commentaire": "Vide" }, "lignes": [] });
    engine.before_save(&mut doc, HookOptions::default());

    let mut query = UpdateQuery::new(json!({}), json!({ "$unset": { "details": "" } }));
    assert!(engine.before_update(&mut query, HookOptions::default())?);
    apply(query.update.unwrap().as_array().unwrap(), &mut doc);
    assert!(doc.get("details").is_none());

    let mut expected = json!({ "titre": "Carnet", "lignes": [] });
    engine.before_save(&mut expected, HookOptions::default());
    assert_eq!(doc, expected);
    Ok(())
}
