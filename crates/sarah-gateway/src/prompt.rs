//! Grounded prompt construction for the tutoring model: the strict corpus
//! context, the attached-file block, the Sarah persona, then the
//! action-specific instruction — all selected by the request language.

use sarah_types::api::{ActionRequest, ChatAction};
use sarah_types::models::Language;

pub(crate) fn final_prompt(request: &ActionRequest) -> String {
    let base = base_prompt(
        request.language,
        request.corpus_content.as_deref(),
        request.file_content.as_deref(),
    );

    match request.action {
        ChatAction::Solve => match request.language {
            Language::Ar => format!(
                "{base}سؤال المستخدم: \"{}\"\n\nالتعليمات: أجب على السؤال أو قم بحل المشكلة خطوة بخطوة بناءً على السياق المقدم.",
                request.prompt
            ),
            Language::Fr => format!(
                "{base}Question de l'utilisateur: \"{}\"\n\nInstructions : Réponds à la question ou résous le problème étape par étape en te basant sur le contexte fourni.",
                request.prompt
            ),
        },
        ChatAction::ExplainImage => match request.language {
            Language::Ar => format!(
                "{base}قدم المستخدم صورة وسؤالاً.\nسؤال المستخدم: \"{}\"\n\nالتعليمات: حلل الصورة وأجب على السؤال.",
                request.prompt
            ),
            Language::Fr => format!(
                "{base}L'utilisateur a fourni une image et une question.\nQuestion de l'utilisateur: \"{}\"\n\nInstructions : Analyse l'image et réponds à la question.",
                request.prompt
            ),
        },
        ChatAction::GenerateQuiz => {
            let level = request.level.as_deref().unwrap_or_default();
            let num_questions = request.num_questions.unwrap_or(3);
            match request.language {
                Language::Ar => format!(
                    "{base}الموضوع: {}\nالمستوى: {level}\nعدد الأسئلة: {num_questions}\nالتعليمات: قم بإنشاء اختبار قصير حول الموضوع المحدد، متوافق مع البرنامج التونسي.",
                    request.prompt
                ),
                Language::Fr => format!(
                    "{base}Sujet : {}\nNiveau : {level}\nNombre de questions : {num_questions}\nInstructions : Crée un quiz court sur le sujet spécifié, conforme au programme tunisien.",
                    request.prompt
                ),
            }
        }
    }
}

fn base_prompt(language: Language, corpus_content: Option<&str>, file_content: Option<&str>) -> String {
    let corpus_instruction = match (language, corpus_content) {
        (_, None) => String::new(),
        (Language::Ar, Some(corpus)) => format!(
            "**سياق صارم (قاعدة المعرفة):** يجب أن تبني إجابتك **حصريًا** على الوثائق التالية المقدمة من وزارة التربية التونسية. لا تستشر أي مصدر آخر.\n\n--- بداية الوثائق ---\n{corpus}\n--- نهاية الوثائق ---\n\n"
        ),
        (Language::Fr, Some(corpus)) => format!(
            "**CONTEXTE STRICT (Base de Connaissances):** Tu DOIS baser ta réponse EXCLUSIVEMENT sur les documents suivants fournis par le Ministère de l'Éducation Tunisien. Ne consulte aucune autre source.\n\n--- DÉBUT DES DOCUMENTS ---\n{corpus}\n--- FIN DES DOCUMENTS ---\n\n"
        ),
    };

    let file_instruction = match (language, file_content) {
        (_, None) => String::new(),
        (Language::Ar, Some(file)) => format!(
            "**محتوى الملف المرفق:** لقد أرفق المستخدم ملفًا. يجب أن تستخدم محتواه كمصدر أساسي للحقيقة للإجابة على سؤاله.\n\n--- بداية محتوى الملف ---\n{file}\n--- نهاية محتوى الملف ---\n\n"
        ),
        (Language::Fr, Some(file)) => format!(
            "**CONTENU DU FICHIER JOINT :** L'utilisateur a joint un fichier. Tu dois utiliser son contenu comme source de vérité principale pour répondre à sa question.\n\n--- DÉBUT CONTENU FICHIER ---\n{file}\n--- FIN CONTENU FICHIER ---\n\n"
        ),
    };

    let persona = match language {
        Language::Ar => "أنتِ سارة، مساعدة تعليمية خبيرة متخصصة في **النظام التعليمي التونسي**. أنتِ أيضًا سباقة. إذا لاحظتِ فجوة في معرفة الطالب، اقترحي بلطف سؤال متابعة أو اختبارًا قصيرًا لمساعدته على التحسن. ابدئي اقتراحاتك بـ '**اقتراح:**'.\nيجب أن تكون جميع إجاباتك وأمثلتك وتوضيحاتك متوافقة مع **البرنامج الرسمي التونسي** للمستوى المحدد.\nعندما تطلب منك إنشاء رسم بياني، استخدم صيغة Mermaid.js في كتلة تعليمات برمجية ```mermaid.\nعندما تكتب معادلات كيميائية أو رياضية، استخدم صيغة KaTeX (محاطة بـ $ أو $$).",
        Language::Fr => "Tu es Sarah, une tutrice IA experte, spécialisée dans le **système éducatif tunisien**. Tu es également proactive. Si tu remarques une lacune dans les connaissances de l'élève, suggère poliment une question de suivi ou un petit quiz pour l'aider à s'améliorer. Commence tes suggestions par '**Suggestion :**'.\nToutes tes réponses, exemples et explications doivent être conformes au **programme officiel tunisien** pour le niveau spécifié.\nLorsque l'on te demande de créer un diagramme, génère la syntaxe Mermaid.js dans un bloc de code ```mermaid.\nLorsque tu écris des équations chimiques ou mathématiques, utilise la syntaxe KaTeX (entourée par $ ou $$).",
    };

    format!("{corpus_instruction}{file_instruction}{persona}\n\n")
}

/// Structured-output schema for quiz generation, in the inference
/// provider's schema dialect.
pub(crate) fn quiz_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "correctAnswer": { "type": "STRING" },
                        "explanation": { "type": "STRING" }
                    },
                    "required": ["question", "options", "correctAnswer", "explanation"]
                }
            }
        },
        "required": ["title", "questions"]
    })
}
